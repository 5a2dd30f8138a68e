//! Traversal of the parent → child theme relation.

use std::collections::{HashMap, HashSet, VecDeque};

use uuid::Uuid;

/// Collects every descendant of `root` in breadth-first order.
///
/// `edges` are `(parent, child)` pairs in the order children should be
/// visited. Each id is returned at most once and `root` is never returned,
/// so cyclic or duplicated edges cannot make the walk loop.
pub fn breadth_first_descendants(root: Uuid, edges: &[(Uuid, Uuid)]) -> Vec<Uuid> {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (parent, child) in edges {
        children.entry(*parent).or_default().push(*child);
    }

    let mut visited = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);
    let mut ordered = Vec::new();

    while let Some(current) = queue.pop_front() {
        let Some(direct) = children.get(&current) else {
            continue;
        };
        for child in direct {
            if visited.insert(*child) {
                ordered.push(*child);
                queue.push_back(*child);
            }
        }
    }

    ordered
}
