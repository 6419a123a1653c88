//! Build-context dependency recording.
//!
//! The loader reports every filesystem path a record was derived from to
//! the currently entered context, so a build scheduler can trigger precise
//! rebuilds.  Contexts are scoped: entering returns a guard, dropping the
//! guard leaves the scope.  Absence of a context is a legal state and
//! tracking simply no-ops.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Rc<Context>>> = const { RefCell::new(Vec::new()) };
}

/// A dependency-recording scope for one build operation.
#[derive(Debug, Default)]
pub struct Context {
    dependencies: RefCell<BTreeSet<PathBuf>>,
}

impl Context {
    pub fn new() -> Rc<Self> {
        Rc::new(Context::default())
    }

    /// Record that the current operation read the given filesystem path.
    pub fn record_dependency(&self, path: impl Into<PathBuf>) {
        self.dependencies.borrow_mut().insert(path.into());
    }

    /// Snapshot of everything recorded so far, in sorted order.
    pub fn referenced_dependencies(&self) -> Vec<PathBuf> {
        self.dependencies.borrow().iter().cloned().collect()
    }

    pub fn depends_on(&self, path: &Path) -> bool {
        self.dependencies.borrow().contains(path)
    }

    /// Enter this context on the current thread.  The context stays active
    /// until the returned guard drops; scopes nest.
    pub fn enter(self: &Rc<Self>) -> ContextGuard {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(Rc::clone(self)));
        ContextGuard { _priv: () }
    }
}

/// RAII guard holding a context scope open.
#[must_use = "the context leaves scope when the guard drops"]
#[derive(Debug)]
pub struct ContextGuard {
    _priv: (),
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Run a closure against the innermost active context, if any.
pub fn with_ctx<R>(f: impl FnOnce(&Context) -> R) -> Option<R> {
    let ctx = CONTEXT_STACK.with(|stack| stack.borrow().last().cloned());
    ctx.map(|ctx| f(&ctx))
}

/// The innermost active context, for operations that require one.
///
/// # Panics
///
/// Panics when no context is entered; requiring a context outside a build
/// scope is a usage fault, not a recoverable condition.
pub fn require_ctx() -> Rc<Context> {
    CONTEXT_STACK
        .with(|stack| stack.borrow().last().cloned())
        .expect("this operation requires an active build context but none is entered")
}
