//! The per-connection prepared-statement cache (C5): an LRU keyed by SQL text.
//!
//! An LRU eviction here returns the evicted entry so the connection can send `Close` for it on
//! the wire — immediately if it isn't the statement currently in flight, or deferred until the
//! connection is next idle if it is, so a busy portal's backing statement is never closed out
//! from under it.

use std::sync::Arc;

use lru_cache::LruCache;

/// Prefixes every cache-assigned statement name, so it can never collide with a name a caller
/// might pick via an explicit SQL-level `PREPARE name AS ...`.
const STATEMENT_NAME_PREFIX: &str = "pgcore_stmt_";

/// Implemented by whatever a connection stores per cached statement, so the cache can compare an
/// evicted entry against the connection's notion of "currently in flight" without knowing its
/// shape.
pub(crate) trait Named {
    fn name(&self) -> &str;
}

impl<T: Named> Named for Arc<T> {
    fn name(&self) -> &str {
        self.as_ref().name()
    }
}

/// A statement evicted by [`StatementCache::insert`]. `blocked` is `true` when the evicted
/// statement's name matched the `in_flight` name passed to `insert`, meaning the connection must
/// defer sending `Close` for it until that operation finishes.
pub(crate) struct Evicted<V> {
    pub(crate) value: V,
    pub(crate) blocked: bool,
}

pub(crate) struct StatementCache<V> {
    inner: LruCache<String, V>,
    capacity: usize,
    next_id: u64,
}

impl<V> StatementCache<V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            // `LruCache::new(0)` panics on the first insert; the cache is simply bypassed
            // entirely when disabled, so the real capacity never matters in that case.
            inner: LruCache::new(capacity.max(1)),
            capacity,
            next_id: 0,
        }
    }

    /// `false` once `capacity` is `0`: every statement is unnamed and never cached (§4.5).
    pub(crate) fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    /// Reserves the next statement name. Does not touch the cache; call [`Self::insert`] once the
    /// server has confirmed `ParseComplete` for it.
    pub(crate) fn next_name(&mut self) -> String {
        self.next_id += 1;
        format!("{STATEMENT_NAME_PREFIX}{}", self.next_id)
    }

    pub(crate) fn get(&mut self, sql: &str) -> Option<&V> {
        if !self.is_enabled() {
            return None;
        }

        self.inner.get_mut(sql).map(|v| &*v)
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<V: Named> StatementCache<V> {
    /// Inserts a freshly prepared statement, evicting the least-recently-used entry if the cache
    /// is already full. `in_flight` is the name of whatever statement this connection is
    /// currently executing, if any (per §5, there is at most one); an eviction that names it is
    /// returned with `blocked: true` rather than being safe to `Close` right away.
    ///
    /// No-op (returns `None`, inserts nothing) when the cache is disabled.
    pub(crate) fn insert(&mut self, sql: String, value: V, in_flight: Option<&str>) -> Option<Evicted<V>> {
        if !self.is_enabled() {
            return None;
        }

        let evicted = if self.inner.len() == self.inner.capacity() && !self.inner.contains_key(&sql) {
            self.inner.remove_lru()
        } else {
            self.inner.remove(&sql)
        };

        self.inner.insert(sql, value);

        evicted.map(|(_, value)| {
            let blocked = in_flight == Some(value.name());
            Evicted { value, blocked }
        })
    }

    /// Drops every entry without a wire-level `Close`, e.g. on connection teardown where the
    /// socket is about to be shut down anyway.
    pub(crate) fn clear(&mut self) {
        while self.inner.remove_lru().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Eq, Debug)]
    struct Stmt(String);

    impl Named for Stmt {
        fn name(&self) -> &str {
            &self.0
        }
    }

    #[test]
    fn it_disables_caching_at_zero_capacity() {
        let mut cache: StatementCache<Stmt> = StatementCache::new(0);
        assert!(!cache.is_enabled());
        assert!(cache
            .insert("select 1".into(), Stmt("s1".into()), None)
            .is_none());
        assert_eq!(cache.get("select 1"), None);
    }

    #[test]
    fn it_returns_a_cache_hit() {
        let mut cache: StatementCache<Stmt> = StatementCache::new(2);
        cache.insert("select 1".into(), Stmt("s1".into()), None);
        assert_eq!(cache.get("select 1"), Some(&Stmt("s1".into())));
    }

    #[test]
    fn it_evicts_the_least_recently_used_entry_when_full() {
        let mut cache: StatementCache<Stmt> = StatementCache::new(2);
        assert!(cache
            .insert("a".into(), Stmt("s1".into()), None)
            .is_none());
        assert!(cache
            .insert("b".into(), Stmt("s2".into()), None)
            .is_none());

        // touch "a" so "b" becomes least-recently-used
        cache.get("a");

        let evicted = cache.insert("c".into(), Stmt("s3".into()), None).unwrap();
        assert_eq!(evicted.value, Stmt("s2".into()));
        assert!(!evicted.blocked);

        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(&Stmt("s1".into())));
        assert_eq!(cache.get("c"), Some(&Stmt("s3".into())));
    }

    #[test]
    fn it_marks_an_eviction_of_the_in_flight_statement_as_blocked() {
        let mut cache: StatementCache<Stmt> = StatementCache::new(1);
        cache.insert("a".into(), Stmt("s1".into()), None);

        let evicted = cache
            .insert("b".into(), Stmt("s2".into()), Some("s1"))
            .unwrap();
        assert_eq!(evicted.value, Stmt("s1".into()));
        assert!(evicted.blocked);
    }

    #[test]
    fn it_replaces_an_existing_key_without_counting_it_as_an_eviction() {
        let mut cache: StatementCache<Stmt> = StatementCache::new(1);
        cache.insert("a".into(), Stmt("s1".into()), None);
        let evicted = cache.insert("a".into(), Stmt("s1-reprepared".into()), None).unwrap();
        assert_eq!(evicted.value, Stmt("s1".into()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn names_are_assigned_in_order_and_never_reused() {
        let mut cache: StatementCache<Stmt> = StatementCache::new(4);
        assert_eq!(cache.next_name(), "pgcore_stmt_1");
        assert_eq!(cache.next_name(), "pgcore_stmt_2");
    }
}
