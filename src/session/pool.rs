//! Per-context session pool
//!
//! Keeps at most one [`HttpSession`] per [`ContextId`]. Sessions are created
//! lazily on first use, reference counted by the leases handed out, and
//! closed as soon as the last lease for their context is dropped.

use crate::{
    Result,
    session::{
        ContextId,
        network::{HttpSession, SessionSettings, TlsTrust},
    },
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

#[derive(Debug)]
struct SessionEntry {
    session: Arc<HttpSession>,
    use_count: usize,
}

/// Counters describing pool activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Sessions created
    pub sessions_created: u64,
    /// Sessions closed
    pub sessions_closed: u64,
    /// Leases handed out
    pub leases_acquired: u64,
    /// Leases returned
    pub leases_released: u64,
    /// Sessions currently alive
    pub live_sessions: usize,
}

/// Pool of HTTP sessions keyed by execution context
#[derive(Debug)]
pub struct SessionPool {
    sessions: DashMap<ContextId, SessionEntry>,
    settings: SessionSettings,
    trust: TlsTrust,
    created: AtomicU64,
    closed: AtomicU64,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl SessionPool {
    /// Create an empty pool
    pub fn new(settings: SessionSettings, trust: TlsTrust) -> Self {
        Self {
            sessions: DashMap::new(),
            settings,
            trust,
            created: AtomicU64::new(0),
            closed: AtomicU64::new(0),
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
        }
    }

    /// Trust material sessions are built with
    pub fn trust(&self) -> &TlsTrust {
        &self.trust
    }

    /// Lease the session of `context`, creating it when absent
    ///
    /// Creation and the use count increment happen under the same map entry
    /// lock, so concurrent callers in one context share a single session.
    pub fn acquire(self: &Arc<Self>, context: ContextId, token: Option<&str>) -> Result<SessionLease> {
        let session = match self.sessions.entry(context) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.use_count += 1;
                trace!(context = %context, uses = entry.use_count, "Reusing HTTP session");
                entry.session.clone()
            }
            Entry::Vacant(vacant) => {
                let session = Arc::new(HttpSession::new(
                    context,
                    &self.settings,
                    &self.trust,
                    token,
                )?);
                self.created.fetch_add(1, Ordering::Relaxed);
                vacant.insert(SessionEntry {
                    session: session.clone(),
                    use_count: 1,
                });
                session
            }
        };

        self.acquired.fetch_add(1, Ordering::Relaxed);

        Ok(SessionLease {
            pool: Arc::clone(self),
            context,
            session,
        })
    }

    fn release(&self, context: ContextId, session: &Arc<HttpSession>) {
        self.released.fetch_add(1, Ordering::Relaxed);

        let removed = match self.sessions.entry(context) {
            Entry::Occupied(mut occupied) => {
                // Slot may already hold a newer session after close_all
                if !Arc::ptr_eq(&occupied.get().session, session) {
                    None
                } else {
                    let entry = occupied.get_mut();
                    entry.use_count = entry.use_count.saturating_sub(1);
                    if entry.use_count == 0 {
                        Some(occupied.remove().session)
                    } else {
                        None
                    }
                }
            }
            Entry::Vacant(_) => None,
        };

        if let Some(session) = removed {
            self.close_session(&session);
        }
    }

    fn close_session(&self, session: &HttpSession) {
        if session.close() {
            self.closed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Push a new access token into every live session
    pub fn apply_token(&self, token: &str) {
        for entry in self.sessions.iter() {
            entry.session.set_token(token);
        }
        debug!(sessions = self.sessions.len(), "Applied access token to live sessions");
    }

    /// Close every live session
    ///
    /// Outstanding leases stay usable; dropping them afterwards is a no-op.
    pub fn close_all(&self) {
        let contexts: Vec<ContextId> = self.sessions.iter().map(|e| *e.key()).collect();
        for context in contexts {
            if let Some((_, entry)) = self.sessions.remove(&context) {
                self.close_session(&entry.session);
            }
        }
    }

    /// Number of live sessions
    pub fn live_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Use count of the session bound to `context`
    pub fn use_count(&self, context: ContextId) -> usize {
        self.sessions
            .get(&context)
            .map(|entry| entry.use_count)
            .unwrap_or(0)
    }

    /// Snapshot of the pool counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            sessions_created: self.created.load(Ordering::Relaxed),
            sessions_closed: self.closed.load(Ordering::Relaxed),
            leases_acquired: self.acquired.load(Ordering::Relaxed),
            leases_released: self.released.load(Ordering::Relaxed),
            live_sessions: self.sessions.len(),
        }
    }
}

/// A counted use of a pooled session; dropping it releases the use
#[derive(Debug)]
pub struct SessionLease {
    pool: Arc<SessionPool>,
    context: ContextId,
    session: Arc<HttpSession>,
}

impl SessionLease {
    /// The leased session
    pub fn session(&self) -> &HttpSession {
        &self.session
    }

    /// Context the lease was taken in
    pub fn context(&self) -> ContextId {
        self.context
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.pool.release(self.context, &self.session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ExecutionContext;
    use std::time::Duration;

    fn pool() -> Arc<SessionPool> {
        Arc::new(SessionPool::new(
            SessionSettings {
                client_name: "tests".to_string(),
                device_id: "dev".to_string(),
                timeout: Duration::from_secs(5),
            },
            TlsTrust::default(),
        ))
    }

    #[test]
    fn test_same_context_shares_session() {
        let pool = pool();
        let a = pool.acquire(ContextId::for_thread(), None).unwrap();
        let b = pool.acquire(ContextId::for_thread(), None).unwrap();

        assert!(std::ptr::eq(a.session(), b.session()));
        assert_eq!(pool.use_count(ContextId::for_thread()), 2);
        assert_eq!(pool.stats().sessions_created, 1);
    }

    #[test]
    fn test_distinct_contexts_get_distinct_sessions() {
        let pool = pool();
        let other = ExecutionContext::new().id();
        let a = pool.acquire(ContextId::for_thread(), None).unwrap();
        let b = pool.acquire(other, None).unwrap();

        assert!(!std::ptr::eq(a.session(), b.session()));
        assert_eq!(pool.live_sessions(), 2);
    }

    #[test]
    fn test_last_release_closes_session() {
        let pool = pool();
        let a = pool.acquire(ContextId::for_thread(), None).unwrap();
        let b = pool.acquire(ContextId::for_thread(), None).unwrap();

        drop(a);
        assert_eq!(pool.live_sessions(), 1);
        assert_eq!(pool.stats().sessions_closed, 0);

        drop(b);
        let stats = pool.stats();
        assert_eq!(stats.live_sessions, 0);
        assert_eq!(stats.sessions_closed, 1);
        assert_eq!(stats.leases_acquired, 2);
        assert_eq!(stats.leases_released, 2);
    }

    #[test]
    fn test_reacquire_after_close_creates_new_session() {
        let pool = pool();
        drop(pool.acquire(ContextId::for_thread(), None).unwrap());
        let lease = pool.acquire(ContextId::for_thread(), None).unwrap();

        assert!(!lease.session().is_closed());
        assert_eq!(pool.stats().sessions_created, 2);
    }

    #[test]
    fn test_apply_token_reaches_live_sessions() {
        let pool = pool();
        let lease = pool.acquire(ContextId::for_thread(), Some("old")).unwrap();
        assert_eq!(lease.session().token().as_deref(), Some("old"));

        pool.apply_token("new");
        assert_eq!(lease.session().token().as_deref(), Some("new"));
    }

    #[test]
    fn test_close_all_then_drop_lease() {
        let pool = pool();
        let lease = pool.acquire(ContextId::for_thread(), None).unwrap();

        pool.close_all();
        assert_eq!(pool.live_sessions(), 0);
        assert!(lease.session().is_closed());

        let fresh = pool.acquire(ContextId::for_thread(), None).unwrap();
        drop(lease);

        // Stale lease must not touch the replacement
        assert_eq!(pool.use_count(ContextId::for_thread()), 1);
        assert!(!fresh.session().is_closed());
        assert_eq!(pool.stats().sessions_closed, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquire_in_one_context() {
        let pool = pool();
        let ctx = ExecutionContext::new();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let pool = pool.clone();
            handles.push(tokio::spawn(ctx.scope(async move {
                let lease = pool.acquire(ContextId::current(), None).unwrap();
                tokio::task::yield_now().await;
                drop(lease);
            })));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = pool.stats();
        assert_eq!(stats.leases_acquired, 16);
        assert_eq!(stats.leases_released, 16);
        assert_eq!(stats.live_sessions, 0);
        assert_eq!(stats.sessions_created, stats.sessions_closed);
    }
}
