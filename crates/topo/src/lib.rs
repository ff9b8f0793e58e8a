//! Topological sorter over named groups.
//!
//! Items are registered under a group name with pairwise before/after
//! constraints against other groups. Sorting produces a linearization that
//! honors every constraint, breaking ties by insertion order so the same
//! sequence of adds always yields the same output. Adding an item whose
//! group already exists replaces the existing item at its original
//! position, which is what gives amendments their override-by-place
//! semantics.

use atelier_core::error::SortError;

/// Ordering constraints for one item.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    /// Group name this item is registered under
    pub group: String,

    /// Groups this item must precede
    pub before: Vec<String>,

    /// Groups this item must follow
    pub after: Vec<String>,
}

impl Constraints {
    pub fn new(group: impl Into<String>) -> Self {
        Constraints {
            group: group.into(),
            ..Constraints::default()
        }
    }
}

struct SortNode<T> {
    group: String,
    before: Vec<String>,
    after: Vec<String>,
    item: T,
}

/// Stable, grouped topological sorter.
///
/// Constraints may reference groups that have not been added yet (forward
/// references); names that are never added have no effect on the order.
pub struct Sorter<T> {
    nodes: Vec<SortNode<T>>,
}

impl<T> Default for Sorter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Sorter<T> {
    pub fn new() -> Self {
        Sorter { nodes: Vec::new() }
    }

    /// Register an item under a group. If the group already exists, the new
    /// item replaces the old one in place, keeping its sequence position.
    pub fn add(&mut self, item: T, constraints: Constraints) {
        let node = SortNode {
            group: constraints.group,
            before: constraints.before,
            after: constraints.after,
            item,
        };
        match self.nodes.iter().position(|n| n.group == node.group) {
            Some(i) => self.nodes[i] = node,
            None => self.nodes.push(node),
        }
    }

    /// Number of registered groups.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the sorter is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Consume the sorter and return items in constraint order.
    ///
    /// Kahn's algorithm; among ready nodes the earliest-inserted wins, so
    /// unconstrained items keep their declaration order.
    pub fn sort(self) -> Result<Vec<T>, SortError> {
        let index_of = |nodes: &[SortNode<T>], group: &str| {
            nodes.iter().position(|n| n.group == group)
        };

        // indegree[i] counts nodes that must run before node i
        let n = self.nodes.len();
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut indegree = vec![0usize; n];

        for (i, node) in self.nodes.iter().enumerate() {
            for group in &node.before {
                if let Some(j) = index_of(&self.nodes, group) {
                    successors[i].push(j);
                    indegree[j] += 1;
                }
            }
            for group in &node.after {
                if let Some(j) = index_of(&self.nodes, group) {
                    successors[j].push(i);
                    indegree[i] += 1;
                }
            }
        }

        let mut emitted = vec![false; n];
        let mut order = Vec::with_capacity(n);

        while order.len() < n {
            let next = (0..n).find(|&i| !emitted[i] && indegree[i] == 0);
            let Some(i) = next else {
                let groups = self
                    .nodes
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !emitted[*i])
                    .map(|(_, node)| node.group.clone())
                    .collect();
                return Err(SortError::CyclicDependency { groups });
            };

            emitted[i] = true;
            order.push(i);
            for &j in &successors[i] {
                indegree[j] -= 1;
            }
        }

        let mut slots: Vec<Option<T>> = self.nodes.into_iter().map(|n| Some(n.item)).collect();
        Ok(order
            .into_iter()
            .filter_map(|i| slots[i].take())
            .collect())
    }
}
