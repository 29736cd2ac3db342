//! Prepared statement naming and storage.
use std::{
    hash::{DefaultHasher, Hash, Hasher},
    num::NonZeroUsize,
    sync::atomic::{AtomicU16, Ordering},
};

use lru::LruCache;

const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(24).unwrap();

/// A generated server-side prepared statement name.
///
/// Names are `q` followed by a five digit counter, or the empty string for
/// the unnamed statement.
#[derive(Clone, PartialEq, Eq)]
pub struct StatementName([u8; 6]);

impl StatementName {
    /// The unnamed prepared statement, `""` on the wire.
    pub fn unnamed() -> Self {
        Self([b'?'; 6])
    }

    /// Generate the next statement name.
    pub fn next() -> Self {
        static ID: AtomicU16 = AtomicU16::new(0);

        let id = ID.fetch_add(1, Ordering::SeqCst);
        let mut buf = [b'q', b'0', b'0', b'0', b'0', b'0'];

        let mut b = itoa::Buffer::new();
        let digits = b.format(id).as_bytes();
        let start = buf.len() - digits.len();
        buf[start..].copy_from_slice(digits);

        Self(buf)
    }

    pub fn as_str(&self) -> &str {
        if self.is_unnamed() {
            return "";
        }
        // SAFETY: string only construction and is immutable
        unsafe { std::str::from_utf8_unchecked(&self.0[..]) }
    }

    pub fn is_unnamed(&self) -> bool {
        self.0[0] == b'?'
    }
}

impl std::fmt::Display for StatementName {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Debug for StatementName {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_tuple("StatementName").field(&self.as_str()).finish()
    }
}

impl AsRef<str> for StatementName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Per connection prepared statement storage.
///
/// A bounded map from SQL text to the reusable statement name it was
/// prepared under. Evicting an entry returns the dropped name so the caller
/// can close the statement on the server.
pub struct StatementStorage {
    cache: LruCache<u64, StatementName>,
}

impl StatementStorage {
    pub(crate) fn new() -> Self {
        Self { cache: LruCache::new(DEFAULT_CAPACITY) }
    }

    /// Look up the statement name `sql` was prepared under.
    pub fn get(&mut self, sql: &str) -> Option<StatementName> {
        self.cache.get(&hash(sql)).cloned()
    }

    /// Record `sql` as prepared under `name`.
    ///
    /// Returns the evicted statement name, if the storage was full.
    pub fn insert(&mut self, sql: &str, name: StatementName) -> Option<StatementName> {
        match self.cache.push(hash(sql), name) {
            // a same-key push replaces the value without eviction
            Some((key, old)) if key != hash(sql) => Some(old),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl std::fmt::Debug for StatementStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("StatementStorage").field("len", &self.len()).finish()
    }
}

fn hash(sql: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    sql.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generated_names() {
        let a = StatementName::next();
        let b = StatementName::next();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 6);
        assert!(a.as_str().starts_with('q'));
        assert_eq!(StatementName::unnamed().as_str(), "");
    }

    #[test]
    fn storage_round_trip() {
        let mut storage = StatementStorage::new();
        assert!(storage.get("SELECT 1").is_none());

        let name = StatementName::next();
        assert!(storage.insert("SELECT 1", name.clone()).is_none());
        assert_eq!(storage.get("SELECT 1"), Some(name));
        assert!(storage.get("SELECT 2").is_none());
    }

    #[test]
    fn storage_evicts_least_recently_used() {
        let mut storage = StatementStorage::new();
        for i in 0..DEFAULT_CAPACITY.get() {
            let sql = format!("SELECT {i}");
            assert!(storage.insert(&sql, StatementName::next()).is_none());
        }

        let evicted = storage.insert("SELECT fresh", StatementName::next());
        assert!(evicted.is_some());
        assert_eq!(storage.len(), DEFAULT_CAPACITY.get());
        assert!(storage.get("SELECT 0").is_none());
    }
}
