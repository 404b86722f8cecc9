//! Expansion state and per-cluster detail cache.
//!
//! Sample questions are expensive to fetch, so they load on first expansion
//! only and stay cached for the rest of the session. The loader itself is
//! pure state; the app schedules the actual request when told to.

use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpandAction {
    /// Visibility changed; cached or in-flight data covers the rest.
    Toggled,
    /// The caller must schedule a fetch for this cluster's questions.
    NeedsFetch,
}

#[derive(Debug, Default)]
pub struct DetailLoader {
    expanded: HashSet<i64>,
    cache: HashMap<i64, Vec<String>>,
    in_flight: HashSet<i64>,
}

impl DetailLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the cluster expanded immediately (the UI shows the optimistic
    /// open state) and reports whether a fetch must be scheduled. The
    /// in-flight marker, not just cache presence, prevents a duplicate
    /// request when expand fires again before the first response lands.
    pub fn expand(&mut self, cluster_id: i64) -> ExpandAction {
        self.expanded.insert(cluster_id);

        if self.cache.contains_key(&cluster_id) || self.in_flight.contains(&cluster_id) {
            ExpandAction::Toggled
        } else {
            self.in_flight.insert(cluster_id);
            ExpandAction::NeedsFetch
        }
    }

    /// Hides the cluster's detail. The cache is deliberately kept so
    /// re-expansion is instant.
    pub fn collapse(&mut self, cluster_id: i64) {
        self.expanded.remove(&cluster_id);
    }

    pub fn toggle(&mut self, cluster_id: i64) -> Option<ExpandAction> {
        if self.expanded.contains(&cluster_id) {
            self.collapse(cluster_id);
            None
        } else {
            Some(self.expand(cluster_id))
        }
    }

    /// Applies a finished fetch. A failure stores nothing, so the next
    /// expand after a collapse retries instead of pinning the failure for
    /// the whole session.
    pub fn complete(&mut self, cluster_id: i64, questions: Option<Vec<String>>) {
        self.in_flight.remove(&cluster_id);
        if let Some(questions) = questions {
            self.cache.insert(cluster_id, questions);
        }
    }

    pub fn is_expanded(&self, cluster_id: i64) -> bool {
        self.expanded.contains(&cluster_id)
    }

    pub fn is_loading(&self, cluster_id: i64) -> bool {
        self.in_flight.contains(&cluster_id)
    }

    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn questions(&self, cluster_id: i64) -> Option<&[String]> {
        self.cache.get(&cluster_id).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_expand_schedules_a_fetch() {
        let mut loader = DetailLoader::new();
        assert_eq!(loader.expand(7), ExpandAction::NeedsFetch);
        assert!(loader.is_expanded(7));
        assert!(loader.is_loading(7));
    }

    #[test]
    fn double_expand_before_completion_fetches_once() {
        let mut loader = DetailLoader::new();
        let first = loader.expand(7);
        let second = loader.expand(7);

        assert_eq!(first, ExpandAction::NeedsFetch);
        assert_eq!(second, ExpandAction::Toggled);
    }

    #[test]
    fn collapse_then_expand_hits_the_cache() {
        let mut loader = DetailLoader::new();
        assert_eq!(loader.expand(3), ExpandAction::NeedsFetch);
        loader.complete(3, Some(vec!["a".to_string()]));

        loader.collapse(3);
        assert!(!loader.is_expanded(3));

        assert_eq!(loader.expand(3), ExpandAction::Toggled);
        assert_eq!(loader.questions(3), Some(["a".to_string()].as_slice()));
    }

    #[test]
    fn failure_is_not_cached_and_is_retried() {
        let mut loader = DetailLoader::new();
        assert_eq!(loader.expand(5), ExpandAction::NeedsFetch);
        loader.complete(5, None);

        assert!(loader.questions(5).is_none());
        assert!(!loader.is_loading(5));

        loader.collapse(5);
        assert_eq!(loader.expand(5), ExpandAction::NeedsFetch);
    }

    #[test]
    fn toggle_alternates_visibility() {
        let mut loader = DetailLoader::new();
        assert_eq!(loader.toggle(9), Some(ExpandAction::NeedsFetch));
        assert_eq!(loader.toggle(9), None);
        assert!(!loader.is_expanded(9));

        // Still in flight from the first expand; no second fetch.
        assert_eq!(loader.toggle(9), Some(ExpandAction::Toggled));
    }

    #[test]
    fn completion_applies_while_collapsed() {
        let mut loader = DetailLoader::new();
        loader.expand(2);
        loader.collapse(2);
        loader.complete(2, Some(vec!["late".to_string()]));

        assert_eq!(loader.expand(2), ExpandAction::Toggled);
        assert_eq!(loader.questions(2).map(<[String]>::len), Some(1));
    }
}
