//! Per-course graph snapshot cache.
//!
//! # Invariants
//! - Entries are immutable `Arc<GraphModel>` snapshots; a rebuild swaps the
//!   whole entry and never mutates a published graph.
//! - The write lock is held only for the pointer swap, never during parse,
//!   validation or storage I/O.
//! - Entries are never evicted.

use crate::model::graph::GraphModel;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared, cheaply clonable course-id -> graph snapshot map.
#[derive(Debug, Clone, Default)]
pub struct GraphCache {
    entries: Arc<RwLock<HashMap<String, Arc<GraphModel>>>>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current snapshot for `course_id`, if cached.
    pub fn get(&self, course_id: &str) -> Option<Arc<GraphModel>> {
        self.entries.read().get(course_id).cloned()
    }

    /// Publishes `graph` as the snapshot for its course, returning the previous one.
    pub fn swap(&self, graph: Arc<GraphModel>) -> Option<Arc<GraphModel>> {
        self.entries.write().insert(graph.course_id.clone(), graph)
    }

    /// Publishes `graph` unless another snapshot for the course appeared first.
    ///
    /// Used when rehydrating from storage so a concurrent import is not overwritten.
    pub fn insert_if_absent(&self, graph: Arc<GraphModel>) -> Arc<GraphModel> {
        self.entries
            .write()
            .entry(graph.course_id.clone())
            .or_insert(graph)
            .clone()
    }

    /// Drops the snapshot for `course_id`, returning it.
    pub fn remove(&self, course_id: &str) -> Option<Arc<GraphModel>> {
        self.entries.write().remove(course_id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::GraphCache;
    use crate::model::graph::GraphModel;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::thread;

    fn graph(course_id: &str, chapters: &[&str]) -> Arc<GraphModel> {
        Arc::new(GraphModel {
            course_id: course_id.to_string(),
            chapter_nodes: chapters.iter().map(|c| c.to_string()).collect(),
            term_nodes: BTreeSet::new(),
            edges: Vec::new(),
        })
    }

    #[test]
    fn swap_replaces_whole_snapshot() {
        let cache = GraphCache::new();
        assert!(cache.swap(graph("c", &["a"])).is_none());
        let held = cache.get("c").unwrap();

        let previous = cache.swap(graph("c", &["a", "b"])).unwrap();
        assert!(Arc::ptr_eq(&held, &previous));
        assert_eq!(held.chapter_nodes.len(), 1);
        assert_eq!(cache.get("c").unwrap().chapter_nodes.len(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn insert_if_absent_keeps_existing_snapshot() {
        let cache = GraphCache::new();
        cache.swap(graph("c", &["fresh"]));
        let kept = cache.insert_if_absent(graph("c", &["stale"]));
        assert!(kept.has_chapter("fresh"));
    }

    #[test]
    fn remove_leaves_held_snapshots_intact() {
        let cache = GraphCache::new();
        cache.swap(graph("c", &["a"]));
        let held = cache.get("c").unwrap();

        let removed = cache.remove("c").unwrap();
        assert!(Arc::ptr_eq(&held, &removed));
        assert!(cache.get("c").is_none());
        assert!(cache.is_empty());
        assert!(cache.remove("c").is_none());
    }

    #[test]
    fn readers_only_observe_complete_snapshots() {
        let cache = GraphCache::new();
        cache.swap(graph("c", &["a"]));

        let writer = {
            let cache = cache.clone();
            thread::spawn(move || {
                for round in 0..200 {
                    let chapters: Vec<String> = (0..=round % 5).map(|i| format!("ch{i}")).collect();
                    let refs: Vec<&str> = chapters.iter().map(String::as_str).collect();
                    cache.swap(graph("c", &refs));
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let snapshot = cache.get("c").unwrap();
                        let expected: Vec<String> =
                            (0..snapshot.chapter_nodes.len()).map(|i| format!("ch{i}")).collect();
                        if snapshot.has_chapter("a") {
                            continue;
                        }
                        let actual: Vec<String> = snapshot.chapter_nodes.iter().cloned().collect();
                        assert_eq!(actual, expected);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
