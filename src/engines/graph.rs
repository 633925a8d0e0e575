//! In-process reasoning graph.
//!
//! Nodes are stored in an adjacency map; parent links create undirected
//! edges and `path` walks them breadth-first, so the result is a shortest
//! path in hop count.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;

use super::GraphStore;

#[derive(Default)]
struct GraphInner {
    content: HashMap<String, String>,
    edges: HashMap<String, HashSet<String>>,
}

#[derive(Default)]
pub struct InMemoryGraphStore {
    inner: RwLock<GraphInner>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for InMemoryGraphStore {
    fn add_node(&self, id: &str, content: &str, parent: Option<&str>) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.content.insert(id.to_string(), content.to_string());
        inner.edges.entry(id.to_string()).or_default();

        if let Some(parent) = parent {
            inner.edges.entry(parent.to_string()).or_default().insert(id.to_string());
            inner.edges.entry(id.to_string()).or_default().insert(parent.to_string());
        }
    }

    fn path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        if !inner.edges.contains_key(from) || !inner.edges.contains_key(to) {
            return None;
        }
        if from == to {
            return Some(vec![from.to_string()]);
        }

        // BFS with backpointers
        let mut previous: HashMap<&str, &str> = HashMap::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(from);
        previous.insert(from, from);

        while let Some(current) = queue.pop_front() {
            let Some(neighbors) = inner.edges.get(current) else {
                continue;
            };
            for neighbor in neighbors {
                let neighbor = neighbor.as_str();
                if previous.contains_key(neighbor) {
                    continue;
                }
                previous.insert(neighbor, current);
                if neighbor == to {
                    let mut path = vec![to.to_string()];
                    let mut step = to;
                    while step != from {
                        step = previous[step];
                        path.push(step.to_string());
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(neighbor);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_path_through_parents() {
        let graph = InMemoryGraphStore::new();
        graph.add_node("root", "start", None);
        graph.add_node("a", "step a", Some("root"));
        graph.add_node("b", "step b", Some("a"));

        assert_eq!(
            graph.path("root", "b"),
            Some(vec!["root".to_string(), "a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn path_is_shortest_in_hops() {
        let graph = InMemoryGraphStore::new();
        graph.add_node("root", "start", None);
        graph.add_node("a", "long way", Some("root"));
        graph.add_node("b", "long way", Some("a"));
        graph.add_node("end", "finish", Some("b"));
        // direct shortcut root -> end
        graph.add_node("end", "finish", Some("root"));

        assert_eq!(
            graph.path("root", "end"),
            Some(vec!["root".to_string(), "end".to_string()])
        );
    }

    #[test]
    fn disconnected_or_unknown_nodes_have_no_path() {
        let graph = InMemoryGraphStore::new();
        graph.add_node("a", "alone", None);
        graph.add_node("b", "also alone", None);
        assert_eq!(graph.path("a", "b"), None);
        assert_eq!(graph.path("a", "missing"), None);
    }

    #[test]
    fn trivial_path_to_self() {
        let graph = InMemoryGraphStore::new();
        graph.add_node("a", "alone", None);
        assert_eq!(graph.path("a", "a"), Some(vec!["a".to_string()]));
    }
}
