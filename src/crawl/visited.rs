//! Visited set and flattener
//!
//! A key is claimed the moment it is taken off the queue, before its fetch
//! starts, so a second queued copy of the same key never triggers a fetch.

use indexmap::IndexMap;

use crate::crawl::key::PackageKey;

/// Outcome recorded for a claimed key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitState {
    /// Fetch started, no outcome yet
    Claimed,
    /// Fetched; holds the concrete version the registry picked
    Resolved { version: String },
    /// Fetch failed; the key contributes no children
    Failed,
}

#[derive(Debug, Clone)]
struct Visit {
    state: VisitState,
    parent: Option<PackageKey>,
}

/// Keys seen during one crawl, in discovery order
#[derive(Debug, Default)]
pub struct VisitedSet {
    entries: IndexMap<PackageKey, Visit>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key` for fetching
    ///
    /// Returns false if the key was already claimed; the caller must then
    /// drop its entry without fetching.
    pub fn claim(&mut self, key: &PackageKey, parent: Option<&PackageKey>) -> bool {
        if self.entries.contains_key(key) {
            return false;
        }
        self.entries.insert(
            key.clone(),
            Visit {
                state: VisitState::Claimed,
                parent: parent.cloned(),
            },
        );
        true
    }

    pub fn mark_resolved(&mut self, key: &PackageKey, version: &str) {
        self.set_state(
            key,
            VisitState::Resolved {
                version: version.to_string(),
            },
        );
    }

    pub fn mark_failed(&mut self, key: &PackageKey) {
        self.set_state(key, VisitState::Failed);
    }

    fn set_state(&mut self, key: &PackageKey, state: VisitState) {
        if let Some(visit) = self.entries.get_mut(key) {
            visit.state = state;
        }
    }

    /// Key of the package that first declared `key`
    pub fn parent(&self, key: &PackageKey) -> Option<&PackageKey> {
        self.entries.get(key).and_then(|visit| visit.parent.as_ref())
    }

    /// First-discovery chain from a seed down to `key`, `key` last
    ///
    /// Empty if `key` was never claimed.
    pub fn path(&self, key: &PackageKey) -> Vec<PackageKey> {
        if !self.entries.contains_key(key) {
            return Vec::new();
        }

        let mut path = vec![key.clone()];
        let mut current = key;
        // Parents are claimed before their children, so the chain cannot loop
        while let Some(parent) = self.parent(current) {
            path.push(parent.clone());
            current = parent;
        }
        path.reverse();
        path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every claimed key as `name@spec`, failed fetches included
    pub fn flatten(&self) -> Vec<String> {
        self.entries.keys().map(PackageKey::to_string).collect()
    }

    /// Concrete version picked for every successfully fetched key
    pub fn resolved(&self) -> IndexMap<String, String> {
        self.entries
            .iter()
            .filter_map(|(key, visit)| match &visit.state {
                VisitState::Resolved { version } => Some((key.to_string(), version.clone())),
                _ => None,
            })
            .collect()
    }

    /// Keys whose fetch failed, as `name@spec`
    pub fn failed(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, visit)| visit.state == VisitState::Failed)
            .map(|(key, _)| key.to_string())
            .collect()
    }
}
