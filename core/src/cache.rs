use std::collections::HashMap;

/// Bounded key/value cache that evicts the least-recently-used entry when
/// full. Not internally synchronized; the server wraps one instance in a
/// mutex and shares it across request handlers.
pub struct RecencyCache<V> {
    max_size: usize,
    map: HashMap<String, V>,
    /// Head is least-recently-used, tail is most-recently-used. Every cached
    /// key appears here exactly once.
    recency: Vec<String>,
}

impl<V> RecencyCache<V> {
    /// Capacity is fixed for the lifetime of the cache.
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "cache capacity must be at least 1");
        Self {
            max_size,
            map: HashMap::with_capacity(max_size),
            recency: Vec::with_capacity(max_size),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Look up a key, promoting it to most-recently-used on a hit.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        if self.map.contains_key(key) {
            self.promote(key);
        }
        self.map.get(key)
    }

    /// Insert or replace a value. Replacing a resident key updates it in
    /// place and promotes it; it never evicts a neighbour, even at capacity.
    /// Inserting a new key into a full cache first evicts the head of the
    /// recency order.
    pub fn put(&mut self, key: String, value: V) {
        if self.map.contains_key(&key) {
            self.map.insert(key.clone(), value);
            self.promote(&key);
            return;
        }
        if self.map.len() == self.max_size {
            self.evict();
        }
        self.recency.push(key.clone());
        self.map.insert(key, value);
    }

    fn promote(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            let k = self.recency.remove(pos);
            self.recency.push(k);
        }
    }

    fn evict(&mut self) {
        if self.recency.is_empty() {
            return;
        }
        let lru = self.recency.remove(0);
        tracing::debug!(key = %lru, "evicting least-recently-used cache entry");
        self.map.remove(&lru);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_up_then_evicts_lru() {
        let mut cache = RecencyCache::new(2);
        cache.put("A".into(), vec![1]);
        cache.put("B".into(), vec![2]);
        cache.put("C".into(), vec![3]);
        assert!(!cache.contains("A"));
        assert!(cache.contains("B"));
        assert!(cache.contains("C"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn get_promotes_over_eviction_pressure() {
        let mut cache = RecencyCache::new(2);
        cache.put("A".into(), vec![1]);
        cache.put("B".into(), vec![2]);
        cache.put("C".into(), vec![3]);
        // B was touched more recently than C, so D pushes out C.
        assert_eq!(cache.get("B"), Some(&vec![2]));
        cache.put("D".into(), vec![4]);
        assert!(!cache.contains("C"));
        assert!(cache.contains("B"));
        assert!(cache.contains("D"));
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let mut cache = RecencyCache::new(3);
        for i in 0..50 {
            cache.put(format!("key{i}"), i);
            assert!(cache.len() <= 3);
        }
        // The three most recent puts survive.
        assert!(cache.contains("key47"));
        assert!(cache.contains("key48"));
        assert!(cache.contains("key49"));
    }

    #[test]
    fn replacing_resident_key_at_capacity_evicts_nothing() {
        let mut cache = RecencyCache::new(2);
        cache.put("A".into(), 1);
        cache.put("B".into(), 2);
        cache.put("A".into(), 10);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains("B"));
        assert_eq!(cache.get("A"), Some(&10));
        // A was promoted by the replacement, so C evicts B.
        cache.put("C".into(), 3);
        assert!(!cache.contains("B"));
        assert!(cache.contains("A"));
    }

    #[test]
    fn miss_does_not_promote() {
        let mut cache = RecencyCache::new(2);
        cache.put("A".into(), 1);
        cache.put("B".into(), 2);
        assert_eq!(cache.get("Z"), None);
        cache.put("C".into(), 3);
        assert!(!cache.contains("A"));
    }
}
