use std::collections::{HashMap, VecDeque};

/// Fingerprints kept per line-range key
pub const HISTORY_PER_KEY: usize = 10;

/// Line-range keys kept before the least recently touched one is evicted
pub const HISTORY_KEYS: usize = 1024;

/// Rolling record of overlap fingerprints, keyed by `"start:end"`
#[derive(Debug, Clone, Default)]
pub struct OverlapHistory {
    map: HashMap<String, VecDeque<String>>,
    order: VecDeque<String>,
}

impl OverlapHistory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn key(start_line: usize, end_line: usize) -> String {
        format!("{start_line}:{end_line}")
    }

    /// Whether `fingerprint` was already recorded under `key`
    #[must_use]
    pub fn contains(&self, key: &str, fingerprint: &str) -> bool {
        self.map
            .get(key)
            .is_some_and(|entries| entries.iter().any(|entry| entry == fingerprint))
    }

    /// Whether anything was recorded under `key`
    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.map.get(key).is_some_and(|entries| !entries.is_empty())
    }

    pub fn record(&mut self, key: &str, fingerprint: String) {
        let entries = self.map.entry(key.to_string()).or_default();
        entries.push_back(fingerprint);
        while entries.len() > HISTORY_PER_KEY {
            entries.pop_front();
        }
        self.touch(key);
        while self.order.len() > HISTORY_KEYS {
            if let Some(old) = self.order.pop_back() {
                self.map.remove(&old);
            }
        }
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_front(key.to_string());
    }

    /// Fingerprints recorded under `key`, oldest first
    pub fn entries(&self, key: &str) -> impl Iterator<Item = &str> {
        self.map.get(key).into_iter().flatten().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }
}
