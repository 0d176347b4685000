//! Target Registry

/// Deduplicated, insertion-ordered set of monitored hosts.
///
/// Hosts are trimmed on every operation, so `" a.com "` and `"a.com"` name
/// the same target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetRegistry {
    targets: Vec<String>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `host`, returning `false` when it was already present or blank
    pub fn add(&mut self, host: &str) -> bool {
        let host = host.trim();
        if host.is_empty() || self.contains(host) {
            return false;
        }
        self.targets.push(host.to_string());
        true
    }

    /// Remove `host`, returning `false` when it was not present
    pub fn remove(&mut self, host: &str) -> bool {
        let host = host.trim();
        let before = self.targets.len();
        self.targets.retain(|t| t != host);
        self.targets.len() != before
    }

    pub fn contains(&self, host: &str) -> bool {
        let host = host.trim();
        self.targets.iter().any(|t| t == host)
    }

    /// Owned snapshot, safe to hold across a whole cycle
    pub fn list(&self) -> Vec<String> {
        self.targets.clone()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TargetRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut registry = Self::new();
        for host in iter {
            registry.add(host.as_ref());
        }
        registry
    }
}
