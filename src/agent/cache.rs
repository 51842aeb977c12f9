//! In-memory cache of scraped records
//!
//! Keys are `"{QUALIFIER}:{SUBJECT}"` with whitespace collapsed and letters
//! upper-cased, so `"cmput  174"` and `"CMPUT 174"` share an entry. Only
//! successful lookups are stored and entries never expire.

use super::course::CourseRecord;
use super::instructor::InstructorRecord;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, PartialEq)]
pub enum CachedRecord {
    Course(CourseRecord),
    Instructor(InstructorRecord),
}

/// Normalized cache key (pure function)
pub fn cache_key(qualifier: &str, subject: &str) -> String {
    fn normalize(part: &str) -> String {
        part.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase()
    }
    format!("{}:{}", normalize(qualifier), normalize(subject))
}

/// Shared handle; clones see the same entries
#[derive(Debug, Clone, Default)]
pub struct SourceCache {
    entries: Arc<RwLock<HashMap<String, CachedRecord>>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<CachedRecord> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: String, record: CachedRecord) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, record);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Sorted snapshot of the keys
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
