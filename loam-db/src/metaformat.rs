//! Tokenizer for the `.ln` metadata block format.
//!
//! A metadata file is a sequence of blocks separated by lines consisting of
//! exactly `---`.  Each block starts with `key: inline value`; any further
//! lines belong to the value body.  A literal `---` line inside a value is
//! escaped by adding a dash (`----` reads back as `---`).

/// Tokenize a metadata file into ordered `(key, value)` pairs.
///
/// Blocks without a `key:` header are skipped.  Values are trimmed of
/// surrounding whitespace but keep interior newlines.
///
/// # Examples
///
/// ```
/// use loam_db::metaformat::tokenize;
///
/// let pairs = tokenize("title: Hello\n---\nbody:\n\nFirst line.\nSecond line.\n");
/// assert_eq!(pairs[0], ("title".to_string(), "Hello".to_string()));
/// assert_eq!(pairs[1].1, "First line.\nSecond line.");
/// ```
pub fn tokenize(input: &str) -> Vec<(String, String)> {
    let mut result = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in input.lines() {
        if line.trim_end() == "---" {
            flush_block(&mut result, &block);
            block.clear();
        } else {
            block.push(line);
        }
    }
    flush_block(&mut result, &block);

    result
}

fn flush_block(result: &mut Vec<(String, String)>, block: &[&str]) {
    let Some((first, rest)) = block.split_first() else {
        return;
    };

    let Some((key, inline)) = first.split_once(':') else {
        tracing::debug!("skipping metadata block without key header: {:?}", first);
        return;
    };
    let key = key.trim();
    if key.is_empty() {
        return;
    }

    let inline = inline.trim();
    let body = rest
        .iter()
        .map(|line| unescape_dashes(line))
        .collect::<Vec<_>>()
        .join("\n");
    let body = body.trim();

    let value = if body.is_empty() {
        inline.to_string()
    } else if inline.is_empty() {
        body.to_string()
    } else {
        format!("{}\n{}", inline, body)
    };

    result.push((key.to_string(), value));
}

fn unescape_dashes(line: &str) -> &str {
    let trimmed = line.trim_end();
    if trimmed.len() >= 4 && trimmed.bytes().all(|b| b == b'-') {
        &trimmed[1..]
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pair() {
        let pairs = tokenize("title: My Page\n");
        assert_eq!(pairs, vec![("title".to_string(), "My Page".to_string())]);
    }

    #[test]
    fn test_multiple_blocks() {
        let pairs = tokenize("title: A\n---\n_model: blog\n---\nsort_key: 10\n");
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[1], ("_model".to_string(), "blog".to_string()));
        assert_eq!(pairs[2], ("sort_key".to_string(), "10".to_string()));
    }

    #[test]
    fn test_multiline_value() {
        let pairs = tokenize("body:\n\nline one\nline two\n---\nnext: x\n");
        assert_eq!(pairs[0].1, "line one\nline two");
        assert_eq!(pairs[1].0, "next");
    }

    #[test]
    fn test_inline_plus_body() {
        let pairs = tokenize("body: intro\ncontinued\n");
        assert_eq!(pairs[0].1, "intro\ncontinued");
    }

    #[test]
    fn test_escaped_separator_in_value() {
        let pairs = tokenize("body:\nbefore\n----\nafter\n");
        assert_eq!(pairs[0].1, "before\n---\nafter");
    }

    #[test]
    fn test_block_without_key_is_skipped() {
        let pairs = tokenize("just some text\n---\ntitle: ok\n");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "title");
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("---\n---\n").is_empty());
    }

    #[test]
    fn test_order_is_preserved() {
        let pairs = tokenize("z: 1\n---\na: 2\n---\nm: 3\n");
        let keys: Vec<_> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
