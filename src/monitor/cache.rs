//! Result Cache: the latest measurement per target

use std::collections::BTreeMap;

use crate::Measurement;

#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    entries: BTreeMap<String, Measurement>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry for the measurement's target
    pub fn update(&mut self, measurement: Measurement) {
        self.entries.insert(measurement.target.clone(), measurement);
    }

    pub fn evict(&mut self, target: &str) -> Option<Measurement> {
        self.entries.remove(target)
    }

    pub fn get(&self, target: &str) -> Option<&Measurement> {
        self.entries.get(target)
    }

    pub fn snapshot(&self) -> BTreeMap<String, Measurement> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
