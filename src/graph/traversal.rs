//! BFS reachability closure over the flat object list.

use std::collections::{HashMap, HashSet};

use crate::graph::{DuplicatePolicy, Object};
use crate::ident::HashId;

/// Append-only FIFO of ids with a membership mirror; an id enters at most once.
#[derive(Debug, Default)]
pub struct Worklist {
    order: Vec<HashId>,
    seen: HashSet<HashId>,
}

impl Worklist {
    pub fn new(seed: HashId) -> Self {
        let mut worklist = Self::default();
        worklist.push(seed);
        worklist
    }

    /// Append `id` unless it was ever queued. Returns whether it was added.
    pub fn push(&mut self, id: HashId) -> bool {
        if self.seen.insert(id) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    pub fn get(&self, index: usize) -> Option<HashId> {
        self.order.get(index).copied()
    }

    pub fn contains(&self, id: HashId) -> bool {
        self.seen.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn into_vec(self) -> Vec<HashId> {
        self.order
    }
}

/// Positions of every object associated with an id (its own record, or any
/// record linking to it), ascending so lookups visit objects in list order.
fn association_index(objects: &[Object]) -> HashMap<HashId, Vec<usize>> {
    let mut index: HashMap<HashId, Vec<usize>> = HashMap::new();
    for (pos, obj) in objects.iter().enumerate() {
        index.entry(obj.id).or_default().push(pos);
        for link in &obj.links {
            let positions = index.entry(link.id).or_default();
            // an object may link to the same target more than once
            if positions.last() != Some(&pos) {
                positions.push(pos);
            }
        }
    }
    index
}

/// Compute the closure of ids reachable from `seed`, in discovery order.
///
/// Each queued id pulls in every associated object's own id followed by its
/// link targets. The seed is always the first element, even when no object
/// mentions it.
pub fn reachable_ids(objects: &[Object], seed: HashId) -> Vec<HashId> {
    let index = association_index(objects);
    let mut frontier = Worklist::new(seed);

    let mut i = 0;
    while let Some(id) = frontier.get(i) {
        log::debug!("[{}/{}] expanding {}", i + 1, frontier.len(), id);
        if let Some(positions) = index.get(&id) {
            for &pos in positions {
                let obj = &objects[pos];
                frontier.push(obj.id);
                for link in &obj.links {
                    frontier.push(link.id);
                }
            }
        }
        i += 1;
    }

    frontier.into_vec()
}

/// Return the objects whose id is reachable from `seed`, in original list order.
///
/// An empty result means the seed does not appear in `objects` at all.
pub fn filter_reachable(objects: &[Object], seed: HashId, policy: DuplicatePolicy) -> Vec<Object> {
    let objects = policy.apply(objects);
    let closure: HashSet<HashId> = reachable_ids(&objects, seed).into_iter().collect();

    let filtered: Vec<Object> = objects
        .iter()
        .filter(|o| closure.contains(&o.id))
        .cloned()
        .collect();

    log::info!(
        "Reachability from {}: {} id(s) in closure, {} of {} record(s) kept",
        seed,
        closure.len(),
        filtered.len(),
        objects.len()
    );

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(v: i32) -> HashId {
        HashId::new(v)
    }

    /// A(1) -> B(2) "Actor", B(2) -> C(3) "Rail", D(4) isolated
    fn sample_objects() -> Vec<Object> {
        vec![
            Object::new(id(1), "A").with_link(id(2), "Actor"),
            Object::new(id(2), "B").with_link(id(3), "Rail"),
            Object::new(id(3), "C"),
            Object::new(id(4), "D"),
        ]
    }

    fn names(objects: &[Object]) -> Vec<&str> {
        objects.iter().map(|o| o.name.as_str()).collect()
    }

    #[test]
    fn test_worklist_rejects_duplicates() {
        let mut w = Worklist::new(id(1));
        assert!(!w.push(id(1)));
        assert!(w.push(id(2)));
        assert!(!w.push(id(2)));
        assert_eq!(w.len(), 2);
        assert!(w.contains(id(2)));
        assert_eq!(w.into_vec(), vec![id(1), id(2)]);
    }

    #[test]
    fn test_filter_chain_from_head() {
        let filtered = filter_reachable(&sample_objects(), id(1), DuplicatePolicy::KeepAll);
        assert_eq!(names(&filtered), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_filter_isolated_seed() {
        let filtered = filter_reachable(&sample_objects(), id(4), DuplicatePolicy::KeepAll);
        assert_eq!(names(&filtered), vec!["D"]);
    }

    #[test]
    fn test_filter_absent_seed_is_empty() {
        let objects = sample_objects();
        assert!(filter_reachable(&objects, id(99), DuplicatePolicy::KeepAll).is_empty());
        assert_eq!(reachable_ids(&objects, id(99)), vec![id(99)]);
    }

    #[test]
    fn test_association_includes_incoming_links() {
        // B is reached from C because B links to C
        let filtered = filter_reachable(&sample_objects(), id(3), DuplicatePolicy::KeepAll);
        assert_eq!(names(&filtered), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_discovery_order_is_breadth_first() {
        let objects = vec![
            Object::new(id(1), "root").with_link(id(2), "L").with_link(id(3), "L"),
            Object::new(id(2), "left").with_link(id(4), "L"),
            Object::new(id(3), "right").with_link(id(5), "L"),
        ];
        assert_eq!(
            reachable_ids(&objects, id(1)),
            vec![id(1), id(2), id(3), id(4), id(5)]
        );
    }

    #[test]
    fn test_cycle_terminates() {
        let objects = vec![
            Object::new(id(1), "A").with_link(id(2), "L"),
            Object::new(id(2), "B").with_link(id(1), "L"),
            Object::new(id(3), "C").with_link(id(3), "Self"),
        ];
        assert_eq!(reachable_ids(&objects, id(1)), vec![id(1), id(2)]);
        assert_eq!(reachable_ids(&objects, id(3)), vec![id(3)]);
    }

    #[test]
    fn test_exact_matching_not_substring() {
        // 12 contains "1" and "2" textually; must stay out of the closure of 1
        let objects = vec![
            Object::new(id(1), "A").with_link(id(2), "L"),
            Object::new(id(2), "B"),
            Object::new(id(12), "Decoy").with_link(id(112), "L"),
            Object::new(id(112), "Decoy2"),
        ];
        let filtered = filter_reachable(&objects, id(1), DuplicatePolicy::KeepAll);
        assert_eq!(names(&filtered), vec!["A", "B"]);
    }

    #[test]
    fn test_output_follows_list_order_not_discovery() {
        let objects = vec![
            Object::new(id(3), "C"),
            Object::new(id(2), "B").with_link(id(3), "L"),
            Object::new(id(1), "A").with_link(id(2), "L"),
        ];
        let filtered = filter_reachable(&objects, id(1), DuplicatePolicy::KeepAll);
        assert_eq!(names(&filtered), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_dangling_link_target_in_closure_without_record() {
        let objects = vec![Object::new(id(1), "A").with_link(id(77), "Missing")];
        assert_eq!(reachable_ids(&objects, id(1)), vec![id(1), id(77)]);
        assert_eq!(filter_reachable(&objects, id(1), DuplicatePolicy::KeepAll).len(), 1);
    }

    #[test]
    fn test_closure_is_fixed_point() {
        let mut objects = sample_objects();
        objects.push(Object::new(id(5), "E").with_link(id(1), "Back"));
        objects.push(Object::new(id(1), "A-variant").with_link(id(6), "Variant"));
        objects.push(Object::new(id(6), "F"));

        for policy in [DuplicatePolicy::KeepAll, DuplicatePolicy::FirstWins] {
            let once = filter_reachable(&objects, id(1), policy);
            let twice = filter_reachable(&once, id(1), policy);
            assert_eq!(once, twice, "not idempotent under {:?}", policy);
        }
    }

    #[test]
    fn test_closure_is_monotonic() {
        let objects = sample_objects();
        let before: HashSet<HashId> = reachable_ids(&objects, id(1)).into_iter().collect();

        let mut extended = objects.clone();
        extended[2].links.push(crate::graph::Link::new(id(4), "New"));
        let after: HashSet<HashId> = reachable_ids(&extended, id(1)).into_iter().collect();

        assert!(before.is_subset(&after));
        assert!(after.contains(&id(4)));
    }

    #[test]
    fn test_duplicate_policies() {
        let objects = vec![
            Object::new(id(1), "Static").with_link(id(2), "L"),
            Object::new(id(2), "B"),
            Object::new(id(1), "Dynamic").with_link(id(3), "L"),
            Object::new(id(3), "C"),
        ];
        let all = filter_reachable(&objects, id(1), DuplicatePolicy::KeepAll);
        assert_eq!(names(&all), vec!["Static", "B", "Dynamic", "C"]);

        let first = filter_reachable(&objects, id(1), DuplicatePolicy::FirstWins);
        assert_eq!(names(&first), vec!["Static", "B"]);
    }
}
