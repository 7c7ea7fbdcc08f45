//! Scoped access to a shared engine
//!
//! Binding layers provide an engine around the code that renders a
//! stick-to-bottom view; anything running inside that scope reads it back
//! without threading it through every call.
//!
//! ```ignore
//! let engine = Rc::new(RefCell::new(StickToBottom::new(config)));
//! provide_stick_to_bottom(engine, || {
//!     let engine = use_stick_to_bottom();
//!     let at_bottom = engine.borrow().is_at_bottom();
//! });
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::scroll::StickToBottom;

/// Engine handle shared between the binding layer and its descendants
pub type SharedEngine = Rc<RefCell<StickToBottom>>;

thread_local! {
    static SCOPES: RefCell<Vec<SharedEngine>> = const { RefCell::new(Vec::new()) };
}

/// Pops the scope even when `f` unwinds
struct ScopeGuard;

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPES.with(|scopes| {
            scopes.borrow_mut().pop();
        });
    }
}

/// Run `f` with `engine` as the innermost stick-to-bottom scope.
///
/// Nested scopes shadow outer ones until they return.
pub fn provide_stick_to_bottom<R>(engine: SharedEngine, f: impl FnOnce() -> R) -> R {
    SCOPES.with(|scopes| scopes.borrow_mut().push(engine));
    let _guard = ScopeGuard;
    f()
}

/// The innermost engine, or [`Error::MissingContext`](crate::Error::MissingContext)
pub fn try_use_stick_to_bottom() -> crate::Result<SharedEngine> {
    SCOPES
        .with(|scopes| scopes.borrow().last().cloned())
        .ok_or(crate::Error::MissingContext)
}

/// The innermost engine.
///
/// # Panics
///
/// Panics when called outside [`provide_stick_to_bottom`]; reading the
/// context there is a programming error.
pub fn use_stick_to_bottom() -> SharedEngine {
    match try_use_stick_to_bottom() {
        Ok(engine) => engine,
        Err(e) => panic!("{}", e),
    }
}
