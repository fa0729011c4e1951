//! Thread-safe domain→address cache with per-entry time-based expiry.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;
use parking_lot::Mutex;

#[derive(Debug, Clone)]
struct CacheEntry {
    address: String,
    // stamped with a monotonic clock, immune to wall-clock adjustments
    expires_at: Instant,
}

/// A mapping from domain name to address string shared by multiple workers.
/// All operations take the map lock for their whole duration; fairness among
/// waiters is not guaranteed. Capacity is unbounded.
#[derive(Debug)]
pub struct DomainsCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl DomainsCache {
    /// The TTL is fixed at construction; there is no runtime mutation.
    pub fn new(ttl: Duration) -> Self {
        DomainsCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Unconditionally record `(address, now + ttl)`, replacing any prior entry.
    pub fn insert(&self, name: &str, address: &str) {
        let entry = CacheEntry {
            address: String::from(address),
            expires_at: Instant::now() + self.ttl,
        };
        debug!("caching {} -> {}", name, address);
        self.entries.lock().insert(String::from(name), entry);
    }

    /// Return the address iff an entry exists and has not expired. Looking up
    /// an expired entry removes it.
    pub fn lookup(&self, name: &str) -> Option<String> {
        let mut entries = self.entries.lock();

        match entries.get(name) {
            Some(entry) if Instant::now() < entry.expires_at => Some(entry.address.clone()),
            Some(_) => {
                debug!("evicting expired entry for {}", name);
                entries.remove(name);
                None
            }
            None => None,
        }
    }

    /// Drop every entry whose expiry has passed.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.entries.lock().retain(|_, entry| now < entry.expires_at);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const TTL: Duration = Duration::from_millis(10);

    #[test]
    fn lookup_before_and_after_expiry() {
        let cache = DomainsCache::new(TTL);
        cache.insert("a", "1");

        thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.lookup("a").as_deref(), Some("1"));

        thread::sleep(Duration::from_millis(6));
        assert_eq!(cache.lookup("a"), None);
        // the expired lookup removed the entry
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn insert_replaces_prior_entry() {
        let cache = DomainsCache::new(Duration::from_secs(60));
        cache.insert("mail.example.com", "192.0.2.1");
        cache.insert("mail.example.com", "192.0.2.2");

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.lookup("mail.example.com").as_deref(),
            Some("192.0.2.2")
        );
    }

    #[test]
    fn miss_on_unknown_name() {
        let cache = DomainsCache::new(TTL);
        assert_eq!(cache.lookup("nowhere"), None);
    }

    #[test]
    fn sweep_keeps_only_live_entries() {
        let cache = DomainsCache::new(Duration::from_millis(20));
        cache.insert("old", "1");

        thread::sleep(Duration::from_millis(25));
        cache.insert("fresh", "2");
        cache.sweep();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("fresh").as_deref(), Some("2"));
        assert_eq!(cache.lookup("old"), None);
    }

    #[test]
    fn concurrent_workers_share_the_map() {
        let cache = Arc::new(DomainsCache::new(Duration::from_secs(60)));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for j in 0..50 {
                        let name = format!("host{}-{}", i, j);
                        cache.insert(&name, "10.0.0.1");
                        assert_eq!(cache.lookup(&name).as_deref(), Some("10.0.0.1"));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 200);
    }
}
