//! Execution context identity
//!
//! Every pooled HTTP session belongs to an execution context. A context is
//! entered explicitly with [`ExecutionContext::scope`]. Code running outside
//! any scope uses a context owned by its OS thread, so independent threads
//! (and the runtimes they drive) never share a session.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::futures::TaskLocalFuture;

tokio::task_local! {
    static CURRENT_CONTEXT: ContextId;
}

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_CONTEXT: ContextId = ContextId::allocate();
}

/// Identity of an execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    fn allocate() -> Self {
        ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Context of the running task, or of the calling thread outside a scope
    pub fn current() -> Self {
        CURRENT_CONTEXT
            .try_with(|id| *id)
            .unwrap_or_else(|_| Self::for_thread())
    }

    /// Context owned by the calling thread, allocated on first use
    pub fn for_thread() -> Self {
        THREAD_CONTEXT.with(|id| *id)
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// A freshly allocated execution context
///
/// ```rust
/// use emby_connector::session::{ContextId, ExecutionContext};
///
/// # tokio_test::block_on(async {
/// let ctx = ExecutionContext::new();
/// let seen = ctx.scope(async { ContextId::current() }).await;
/// assert_eq!(seen, ctx.id());
/// # });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    id: ContextId,
}

impl ExecutionContext {
    /// Allocate a new, unique context
    pub fn new() -> Self {
        Self {
            id: ContextId::allocate(),
        }
    }

    /// The context's identity
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Wrap a future so it runs with this context as the current one
    ///
    /// The returned future does not borrow `self` and can be spawned.
    pub fn scope<F>(&self, fut: F) -> TaskLocalFuture<ContextId, F>
    where
        F: Future,
    {
        CURRENT_CONTEXT.scope(self.id, fut)
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outside_scope_is_thread_context() {
        assert_eq!(ContextId::current(), ContextId::for_thread());
        assert_eq!(ContextId::current(), ContextId::current());
    }

    #[tokio::test]
    async fn test_scope_sets_current() {
        let ctx = ExecutionContext::new();
        let seen = ctx.scope(async { ContextId::current() }).await;
        assert_eq!(seen, ctx.id());
        assert_eq!(ContextId::current(), ContextId::for_thread());
    }

    #[tokio::test]
    async fn test_nested_scopes() {
        let outer = ExecutionContext::new();
        let inner = ExecutionContext::new();

        let (a, b) = outer
            .scope(async {
                let b = inner.scope(async { ContextId::current() }).await;
                (ContextId::current(), b)
            })
            .await;

        assert_eq!(a, outer.id());
        assert_eq!(b, inner.id());
    }

    #[test]
    fn test_threads_get_distinct_contexts() {
        let here = ContextId::current();
        let there = std::thread::spawn(ContextId::current).join().unwrap();
        let again = std::thread::spawn(ContextId::current).join().unwrap();

        assert_ne!(here, there);
        assert_ne!(there, again);
        assert_eq!(here, ContextId::current());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = ExecutionContext::new();
        let b = ExecutionContext::new();
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), ContextId::for_thread());
        assert!(a.id().to_string().starts_with("ctx-"));
    }
}
