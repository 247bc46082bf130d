//! Replaceable operation tables.
//!
//! Every recipe exposes two tables of named operations: an Implementation
//! Table (business logic) and an API Table (HTTP-level handlers). Each table
//! entry is an independently nullable [`Slot`]; the host application may
//! transform a whole table exactly once at initialization through an
//! [`OverrideHook`], wrapping, replacing or deleting entries. After that the
//! table is frozen for the life of the process.
//!
//! The canonical override pattern is capture-and-delegate:
//!
//! ```rust
//! use authkit_core::table::{Slot, call, slot};
//!
//! fn wrap(mut table_entry: Slot<String, usize>) -> Slot<String, usize> {
//!     let original = table_entry.take();
//!     slot(move |input: String| {
//!         let original = original.clone();
//!         async move {
//!             // custom logic, then delegate to the captured original
//!             call(&original, "entry", input).await
//!         }
//!     })
//! }
//! ```

use crate::error::Result;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// The callable stored in a non-null slot.
pub type SlotFn<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O>> + Send + Sync>;

/// One named, independently nullable table entry.
///
/// `None` means "this operation is not exposed"; routing to it renders as
/// not-found, never as an error.
pub type Slot<I, O> = Option<SlotFn<I, O>>;

/// Build a slot from an async function or closure.
pub fn slot<I, O, F, Fut>(f: F) -> Slot<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    Some(Arc::new(move |input| Box::pin(f(input))))
}

/// Invoke a slot that the caller requires to be live.
///
/// # Panics
///
/// Panics when the slot is null. A null business slot reachable from a live
/// API slot means an override deleted an operation the surface still depends
/// on; that is a programming error, not user input, and must fail loudly.
#[allow(clippy::panic)]
pub fn call<I, O>(entry: &Slot<I, O>, operation: &str, input: I) -> BoxFuture<'static, Result<O>>
where
    I: Send + 'static,
    O: Send + 'static,
{
    match entry {
        Some(f) => f(input),
        None => panic!(
            "operation `{operation}` was disabled by an override but is still \
             invoked; the override configuration is inconsistent"
        ),
    }
}

/// A host-supplied pure transformation of a default table.
///
/// Applied at most once per table per process lifetime.
pub type OverrideHook<T> = Box<dyn FnOnce(T) -> T + Send>;

/// The two optional hooks a recipe accepts from host configuration.
///
/// `functions` transforms the Implementation Table and runs **before** the
/// API Table is built (API entries capture implementation slots by value at
/// construction); `apis` transforms the API Table and runs last.
pub struct RecipeOverride<I, A> {
    /// Implementation Table hook.
    pub functions: Option<OverrideHook<I>>,
    /// API Table hook.
    pub apis: Option<OverrideHook<A>>,
}

impl<I, A> Default for RecipeOverride<I, A> {
    fn default() -> Self {
        Self {
            functions: None,
            apis: None,
        }
    }
}

impl<I, A> RecipeOverride<I, A> {
    /// Override with both hooks absent.
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the Implementation Table hook.
    #[must_use]
    pub fn with_functions(mut self, hook: impl FnOnce(I) -> I + Send + 'static) -> Self {
        self.functions = Some(Box::new(hook));
        self
    }

    /// Set the API Table hook.
    #[must_use]
    pub fn with_apis(mut self, hook: impl FnOnce(A) -> A + Send + 'static) -> Self {
        self.apis = Some(Box::new(hook));
        self
    }

    /// Apply the functions hook to a default Implementation Table.
    pub fn apply_functions(&mut self, default: I) -> I {
        match self.functions.take() {
            Some(hook) => hook(default),
            None => default,
        }
    }

    /// Apply the apis hook to a default API Table.
    pub fn apply_apis(&mut self, default: A) -> A {
        match self.apis.take() {
            Some(hook) => hook(default),
            None => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn slot_round_trip() {
        let double: Slot<u32, u32> = slot(|n: u32| async move { Ok(n * 2) });
        let out = call(&double, "double", 21).await;
        assert!(matches!(out, Ok(42)));
    }

    #[tokio::test]
    async fn capture_and_delegate_preserves_output() {
        let seen = Arc::new(AtomicUsize::new(0));
        let mut base: Slot<u32, u32> = slot(|n: u32| async move { Ok(n + 1) });

        let original = base.take();
        let seen_in_wrapper = Arc::clone(&seen);
        base = slot(move |n: u32| {
            let original = original.clone();
            let seen = Arc::clone(&seen_in_wrapper);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                call(&original, "base", n).await
            }
        });

        let out = call(&base, "base", 9).await;
        assert!(matches!(out, Ok(10)));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[should_panic(expected = "disabled by an override")]
    async fn calling_a_null_slot_panics() {
        let gone: Slot<(), ()> = None;
        let _ = call(&gone, "gone", ()).await;
    }

    #[test]
    fn hooks_apply_at_most_once() {
        let mut ov: RecipeOverride<u32, u32> =
            RecipeOverride::none().with_functions(|n| n + 1).with_apis(|n| n * 10);
        assert_eq!(ov.apply_functions(1), 2);
        // Second application is a no-op: the hook was consumed.
        assert_eq!(ov.apply_functions(1), 1);
        assert_eq!(ov.apply_apis(2), 20);
        assert_eq!(ov.apply_apis(2), 2);
    }
}
