use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::accent::AccentRecord;

/// Headword -> resolved accent record, persisted between runs as one JSON
/// blob. Entries are insert-once: a cached record is final for the run.
#[derive(Default, Debug)]
pub struct AccentCache {
    entries: HashMap<String, AccentRecord>,
}

impl AccentCache {
    pub fn new() -> AccentCache {
        AccentCache::default()
    }

    /// Loading is best-effort: a missing or unreadable blob just means a cold
    /// cache, every word falls back to lookup.
    pub fn load(path: &Path) -> AccentCache {
        match fs::read_to_string(path) {
            Ok(blob) => match serde_json::from_str::<HashMap<String, AccentRecord>>(&blob) {
                Ok(entries) => {
                    info!("loaded {} cached accent records", entries.len());
                    AccentCache { entries }
                }
                Err(e) => {
                    warn!("unreadable accent cache {:?}: {}\nStarting cold", path, e);
                    AccentCache::new()
                }
            },
            Err(_) => AccentCache::new(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let blob = serde_json::to_string(&self.entries)?;
        fs::write(path, blob).with_context(|| format!("saving accent cache to {:?}", path))
    }

    pub fn get(&self, headword: &str) -> Option<&AccentRecord> {
        self.entries.get(headword)
    }

    /// First writer wins; re-inserting a headword is a no-op.
    pub fn put(&mut self, record: AccentRecord) {
        self.entries.entry(record.headword.clone()).or_insert(record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(headword: &str, accent_class: u32) -> AccentRecord {
        AccentRecord {
            accent_class,
            pronunciation: "てすと".to_owned(),
            note: String::new(),
            headword: headword.to_owned(),
        }
    }

    #[test]
    fn insert_once_keeps_first_record() {
        let mut cache = AccentCache::new();
        cache.put(record("日本", 2));
        cache.put(record("日本", 5));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("日本").unwrap().accent_class, 2);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accent_cache.json");

        let mut cache = AccentCache::new();
        cache.put(record("日本", 2));
        cache.put(record("楽しい", 3));
        cache.save(&path).unwrap();

        let reloaded = AccentCache::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("日本"), cache.get("日本"));
        assert_eq!(reloaded.get("楽しい"), cache.get("楽しい"));
    }

    #[test]
    fn missing_blob_starts_cold() {
        let cache = AccentCache::load(Path::new("/nonexistent/accent_cache.json"));
        assert!(cache.is_empty());
    }
}
