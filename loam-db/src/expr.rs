//! The query expression DSL.
//!
//! Expressions are a small tagged union of lazily-evaluated nodes built by
//! composing constructor methods; there is no textual syntax to parse.  A
//! node is immutable once built and may be reused across many records:
//!
//! ```no_run
//! use loam_db::expr::F;
//!
//! let expr = F::field("status").eq("published").and(F::field("year").ge(2020i64));
//! ```

use crate::cmp::compare_values;
use crate::record::Record;
use loam_types::Value;
use std::cmp::Ordering;

/// Binary operators applied by [`Expr::Bin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    /// Case-insensitive prefix test on the text rendering.
    StartsWith,
    /// Case-insensitive suffix test on the text rendering.
    EndsWith,
    /// Case-sensitive prefix test.
    StartsWithCs,
    /// Case-sensitive suffix test.
    EndsWithCs,
}

/// A lazily-evaluated expression node.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A fixed value, ignoring the record.
    Literal(Value),
    /// A field lookup on the candidate record; absent fields evaluate to
    /// the undefined sentinel rather than failing.
    Field(String),
    Bin {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Containment test of `item` within the sequence `seq` evaluates to.
    Contains { seq: Box<Expr>, item: Box<Expr> },
}

/// Anything that can stand in for an expression operand.
///
/// Plain values wrap into [`Expr::Literal`]; a record wraps as a literal of
/// its id, which is how containment against record operands compares.
pub trait IntoExpr {
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl IntoExpr for &Record {
    fn into_expr(self) -> Expr {
        Expr::Literal(Value::Text(self.id().to_string()))
    }
}

macro_rules! literal_into_expr {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoExpr for $ty {
                fn into_expr(self) -> Expr {
                    Expr::Literal(Value::from(self))
                }
            }
        )*
    };
}

literal_into_expr!(
    &str,
    String,
    i64,
    f64,
    bool,
    chrono::NaiveDate,
    Vec<String>,
);

impl IntoExpr for Value {
    fn into_expr(self) -> Expr {
        Expr::Literal(self)
    }
}

/// The field proxy: the sole entry point for building field references.
pub struct F;

impl F {
    pub fn field(name: impl Into<String>) -> Expr {
        Expr::Field(name.into())
    }
}

impl Expr {
    pub fn lit(value: impl Into<Value>) -> Expr {
        Expr::Literal(value.into())
    }

    fn bin(self, op: BinOp, other: impl IntoExpr) -> Expr {
        Expr::Bin {
            op,
            left: Box::new(self),
            right: Box::new(other.into_expr()),
        }
    }

    pub fn eq(self, other: impl IntoExpr) -> Expr {
        self.bin(BinOp::Eq, other)
    }

    pub fn ne(self, other: impl IntoExpr) -> Expr {
        self.bin(BinOp::Ne, other)
    }

    pub fn lt(self, other: impl IntoExpr) -> Expr {
        self.bin(BinOp::Lt, other)
    }

    pub fn le(self, other: impl IntoExpr) -> Expr {
        self.bin(BinOp::Le, other)
    }

    pub fn gt(self, other: impl IntoExpr) -> Expr {
        self.bin(BinOp::Gt, other)
    }

    pub fn ge(self, other: impl IntoExpr) -> Expr {
        self.bin(BinOp::Ge, other)
    }

    pub fn and(self, other: impl IntoExpr) -> Expr {
        self.bin(BinOp::And, other)
    }

    pub fn or(self, other: impl IntoExpr) -> Expr {
        self.bin(BinOp::Or, other)
    }

    pub fn startswith(self, other: impl IntoExpr) -> Expr {
        self.bin(BinOp::StartsWith, other)
    }

    pub fn endswith(self, other: impl IntoExpr) -> Expr {
        self.bin(BinOp::EndsWith, other)
    }

    pub fn startswith_cs(self, other: impl IntoExpr) -> Expr {
        self.bin(BinOp::StartsWithCs, other)
    }

    pub fn endswith_cs(self, other: impl IntoExpr) -> Expr {
        self.bin(BinOp::EndsWithCs, other)
    }

    pub fn contains(self, item: impl IntoExpr) -> Expr {
        Expr::Contains {
            seq: Box::new(self),
            item: Box::new(item.into_expr()),
        }
    }

    /// Evaluate this expression against a candidate record.
    ///
    /// Evaluation is side-effect-free; missing fields surface as the
    /// undefined sentinel, never as an error.
    pub fn evaluate(&self, record: &Record) -> Value {
        match self {
            Expr::Literal(value) => value.clone(),
            Expr::Field(name) => record.get(name),
            Expr::Bin { op, left, right } => {
                let a = left.evaluate(record);
                let b = right.evaluate(record);
                apply_bin(*op, &a, &b)
            }
            Expr::Contains { seq, item } => {
                let seq = seq.evaluate(record);
                let item = item.evaluate(record);
                Value::Bool(contains(&seq, &item))
            }
        }
    }
}

fn apply_bin(op: BinOp, a: &Value, b: &Value) -> Value {
    let result = match op {
        BinOp::Eq => a == b,
        BinOp::Ne => a != b,
        BinOp::Lt => ordered(a, b) == Some(Ordering::Less),
        BinOp::Le => matches!(ordered(a, b), Some(Ordering::Less | Ordering::Equal)),
        BinOp::Gt => ordered(a, b) == Some(Ordering::Greater),
        BinOp::Ge => matches!(ordered(a, b), Some(Ordering::Greater | Ordering::Equal)),
        BinOp::And => a.is_true() && b.is_true(),
        BinOp::Or => a.is_true() || b.is_true(),
        BinOp::StartsWith => lower(a).starts_with(&lower(b)),
        BinOp::EndsWith => lower(a).ends_with(&lower(b)),
        BinOp::StartsWithCs => a.to_text().starts_with(&b.to_text()),
        BinOp::EndsWithCs => a.to_text().ends_with(&b.to_text()),
    };
    Value::Bool(result)
}

fn ordered(a: &Value, b: &Value) -> Option<Ordering> {
    // Ordering comparisons involving the sentinel are never true.
    if a.is_undefined() || b.is_undefined() {
        return None;
    }
    Some(compare_values(a, b))
}

fn lower(value: &Value) -> String {
    value.to_text().to_lowercase()
}

fn contains(seq: &Value, item: &Value) -> bool {
    match seq {
        Value::Strings(items) => {
            let needle = item.to_text();
            items.iter().any(|s| *s == needle)
        }
        Value::Text(text) => {
            if item.is_undefined() {
                return false;
            }
            text.contains(&item.to_text())
        }
        _ => false,
    }
}
