//! Sequence graphs: order-preserving unions of witnessed child orders.
//!
//! Every ordered artifact that has been sequenced owns one graph. Each slot of
//! the graph is a numbered position holding the data of the artifact that
//! occupies it. Each child list presented to [`SequenceGraph::sequence`] is
//! recorded as a path; consecutive items of a path become edges. The graph
//! stays acyclic, so every subset of slots has at least one linear extension.
//!
//! ## Alignment
//!
//! A new child list is aligned against a deterministic topological order of
//! the graph with a longest common subsequence. Matches found that way are
//! pairwise order-consistent. Items left over get a second chance: an unused
//! slot with equal data is reused when it does not contradict any match made
//! so far. Everything else gets a fresh slot.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TreeError, TreeResult};

/// Position of an artifact in its parent's sequence graph.
///
/// Numbers start at 1. An artifact without a number carries `None`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SequenceNumber(u32);

impl SequenceNumber {
    /// The first number a graph allocates.
    pub const FIRST: SequenceNumber = SequenceNumber(1);

    /// Wrap a raw number.
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// The raw number.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of a child list presented for sequencing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceItem<D> {
    /// Data of the child's artifact.
    pub data: D,
    /// Number already assigned by this graph, if any.
    pub anchor: Option<SequenceNumber>,
}

impl<D> SequenceItem<D> {
    /// An item without a number.
    pub fn new(data: D) -> Self {
        Self { data, anchor: None }
    }

    /// An item that must land on `number`.
    pub fn anchored(data: D, number: SequenceNumber) -> Self {
        Self {
            data,
            anchor: Some(number),
        }
    }
}

/// Result of aligning one child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    /// Number assigned to each item, in input order.
    pub numbers: Vec<SequenceNumber>,
    /// Indices of the items that got a freshly allocated slot.
    pub fresh: Vec<usize>,
    /// Matches taken while an equally long alternative existed.
    pub ties: usize,
}

/// Merged ordering constraints of the children of one ordered artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceGraph<D> {
    slots: BTreeMap<SequenceNumber, D>,
    successors: BTreeMap<SequenceNumber, BTreeSet<SequenceNumber>>,
    paths: Vec<Vec<SequenceNumber>>,
    next: u32,
}

impl<D> Default for SequenceGraph<D> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
            successors: BTreeMap::new(),
            paths: Vec::new(),
            next: SequenceNumber::FIRST.get(),
        }
    }
}

impl<D: Clone + Eq + fmt::Debug> SequenceGraph<D> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot was allocated yet.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether `number` is a slot of this graph.
    pub fn contains(&self, number: SequenceNumber) -> bool {
        self.slots.contains_key(&number)
    }

    /// Data recorded for the slot `number`.
    pub fn slot(&self, number: SequenceNumber) -> Option<&D> {
        self.slots.get(&number)
    }

    /// All slot numbers in ascending order.
    pub fn numbers(&self) -> impl Iterator<Item = SequenceNumber> + '_ {
        self.slots.keys().copied()
    }

    /// The witnessed paths in the order they were admitted.
    pub fn paths(&self) -> &[Vec<SequenceNumber>] {
        &self.paths
    }

    /// Admit `items` as a valid order and assign a number to each of them.
    ///
    /// Anchored items land on their anchor. An anchor that is not a slot of
    /// this graph, or whose slot holds different data, is ignored. Fails with
    /// [`TreeError::AmbiguousOrder`] when an anchor cannot be honored without
    /// contradicting the recorded order.
    pub fn sequence(&mut self, items: &[SequenceItem<D>]) -> TreeResult<Alignment> {
        self.sequence_reserving(items, &BTreeSet::new())
    }

    fn sequence_reserving(
        &mut self,
        items: &[SequenceItem<D>],
        reserved: &BTreeSet<SequenceNumber>,
    ) -> TreeResult<Alignment> {
        let anchors = self.normalize_anchors(items);
        let mut reserved = reserved.clone();
        reserved.extend(anchors.iter().flatten().copied());

        let order = self.topological_order()?;
        let matches = |i: usize, j: usize| -> bool {
            let slot = order[j];
            if self.slots.get(&slot) != Some(&items[i].data) {
                return false;
            }
            match anchors[i] {
                Some(anchor) => anchor == slot,
                None => !reserved.contains(&slot),
            }
        };

        // dp[i][j]: longest alignment of items[i..] against order[j..]
        let (n, m) = (items.len(), order.len());
        let mut dp = vec![vec![0usize; m + 1]; n + 1];
        for i in (0..n).rev() {
            for j in (0..m).rev() {
                dp[i][j] = if matches(i, j) {
                    dp[i + 1][j + 1] + 1
                } else {
                    dp[i + 1][j].max(dp[i][j + 1])
                };
            }
        }

        let mut assigned: Vec<Option<SequenceNumber>> = vec![None; n];
        let mut ties = 0;
        let (mut i, mut j) = (0, 0);
        while i < n && j < m {
            if matches(i, j) {
                if dp[i][j + 1] == dp[i][j] || dp[i + 1][j] == dp[i][j] {
                    ties += 1;
                }
                assigned[i] = Some(order[j]);
                i += 1;
                j += 1;
            } else if dp[i + 1][j] >= dp[i][j + 1] {
                i += 1;
            } else {
                j += 1;
            }
        }

        self.rescue(items, &anchors, &reserved, &mut assigned);

        for (index, anchor) in anchors.iter().enumerate() {
            if let (Some(anchor), None) = (anchor, assigned[index]) {
                return Err(TreeError::AmbiguousOrder(format!(
                    "item {:?} anchored at slot {} contradicts the recorded order",
                    items[index].data, anchor
                )));
            }
        }

        let mut fresh = Vec::new();
        let mut numbers = Vec::with_capacity(n);
        for (index, slot) in assigned.into_iter().enumerate() {
            let number = match slot {
                Some(number) => number,
                None => {
                    fresh.push(index);
                    self.allocate(items[index].data.clone())
                }
            };
            numbers.push(number);
        }

        self.record_path(&numbers);
        tracing::trace!(
            items = n,
            fresh = fresh.len(),
            ties,
            "Sequenced child list"
        );

        Ok(Alignment {
            numbers,
            fresh,
            ties,
        })
    }

    fn normalize_anchors(&self, items: &[SequenceItem<D>]) -> Vec<Option<SequenceNumber>> {
        let mut seen = BTreeSet::new();
        items
            .iter()
            .map(|item| {
                let anchor = item.anchor?;
                if self.slots.get(&anchor) != Some(&item.data) || !seen.insert(anchor) {
                    tracing::trace!(anchor = %anchor, "Dropping anchor without matching slot");
                    return None;
                }
                Some(anchor)
            })
            .collect()
    }

    /// Second pass over unmatched items: reuse an equal-data slot when it is
    /// consistent with every assignment made so far.
    fn rescue(
        &self,
        items: &[SequenceItem<D>],
        anchors: &[Option<SequenceNumber>],
        reserved: &BTreeSet<SequenceNumber>,
        assigned: &mut [Option<SequenceNumber>],
    ) {
        for index in 0..items.len() {
            if assigned[index].is_some() {
                continue;
            }
            let used: BTreeSet<SequenceNumber> = assigned.iter().flatten().copied().collect();
            let candidates: Vec<SequenceNumber> = match anchors[index] {
                Some(anchor) => vec![anchor],
                None => self
                    .slots
                    .iter()
                    .filter(|(number, data)| {
                        **data == items[index].data
                            && !used.contains(number)
                            && !reserved.contains(number)
                    })
                    .map(|(number, _)| *number)
                    .collect(),
            };

            for candidate in candidates {
                if used.contains(&candidate) {
                    continue;
                }
                let reach = self.reachable_from(candidate);
                let consistent = assigned.iter().enumerate().all(|(k, slot)| match slot {
                    Some(other) if k < index => !reach.contains(other),
                    Some(other) => !self.reaches(*other, candidate),
                    None => true,
                });
                if consistent {
                    assigned[index] = Some(candidate);
                    break;
                }
            }
        }
    }

    fn allocate(&mut self, data: D) -> SequenceNumber {
        let number = SequenceNumber(self.next);
        self.next += 1;
        self.slots.insert(number, data);
        self.successors.entry(number).or_default();
        number
    }

    fn record_path(&mut self, numbers: &[SequenceNumber]) {
        if numbers.is_empty() {
            return;
        }
        for pair in numbers.windows(2) {
            self.successors.entry(pair[0]).or_default().insert(pair[1]);
        }
        if !self.paths.iter().any(|p| p.as_slice() == numbers) {
            self.paths.push(numbers.to_vec());
        }
    }

    fn reachable_from(&self, start: SequenceNumber) -> BTreeSet<SequenceNumber> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if let Some(next) = self.successors.get(&current) {
                for &succ in next {
                    if seen.insert(succ) {
                        stack.push(succ);
                    }
                }
            }
        }
        seen
    }

    fn reaches(&self, from: SequenceNumber, to: SequenceNumber) -> bool {
        self.reachable_from(from).contains(&to)
    }

    /// Whether some witnessed order places `a` before `b`, directly or transitively.
    pub fn precedes(&self, a: SequenceNumber, b: SequenceNumber) -> bool {
        a != b && self.reaches(a, b)
    }

    /// Whether `order` is compatible with every recorded constraint.
    ///
    /// Unknown or repeated slots make an order inconsistent.
    pub fn is_consistent(&self, order: &[SequenceNumber]) -> bool {
        let mut seen = BTreeSet::new();
        if !order.iter().all(|n| self.contains(*n) && seen.insert(*n)) {
            return false;
        }
        order.iter().enumerate().all(|(i, later)| {
            let reach = self.reachable_from(*later);
            order[..i].iter().all(|earlier| !reach.contains(earlier))
        })
    }

    /// Pairs of `subset` for which no witnessed order gives a constraint.
    pub fn uncertain_pairs(
        &self,
        subset: &[SequenceNumber],
    ) -> Vec<(SequenceNumber, SequenceNumber)> {
        let distinct: BTreeSet<SequenceNumber> = subset.iter().copied().collect();
        let distinct: Vec<SequenceNumber> = distinct.into_iter().collect();
        let mut pairs = Vec::new();
        for (i, a) in distinct.iter().enumerate() {
            let reach = self.reachable_from(*a);
            for b in &distinct[i + 1..] {
                if !reach.contains(b) && !self.reaches(*b, *a) {
                    pairs.push((*a, *b));
                }
            }
        }
        pairs
    }

    /// Produce one order of `subset` consistent with all witnessed orders.
    ///
    /// Among unconstrained slots the smallest number comes first, so the
    /// result is deterministic.
    pub fn linearize(&self, subset: &[SequenceNumber]) -> TreeResult<Vec<SequenceNumber>> {
        let members: BTreeSet<SequenceNumber> = subset.iter().copied().collect();
        if let Some(unknown) = members.iter().find(|n| !self.contains(**n)) {
            return Err(TreeError::AmbiguousOrder(format!(
                "slot {} is not part of the sequence graph",
                unknown
            )));
        }

        let mut edges: BTreeMap<SequenceNumber, BTreeSet<SequenceNumber>> = BTreeMap::new();
        let mut indegree: BTreeMap<SequenceNumber, usize> =
            members.iter().map(|n| (*n, 0)).collect();
        for a in &members {
            let reach: BTreeSet<SequenceNumber> = self
                .reachable_from(*a)
                .intersection(&members)
                .copied()
                .collect();
            for b in &reach {
                if let Some(d) = indegree.get_mut(b) {
                    *d += 1;
                }
            }
            edges.insert(*a, reach);
        }

        Self::kahn(&edges, indegree).ok_or_else(|| {
            TreeError::AmbiguousOrder("witnessed orders form a cycle".to_string())
        })
    }

    fn topological_order(&self) -> TreeResult<Vec<SequenceNumber>> {
        let mut indegree: BTreeMap<SequenceNumber, usize> =
            self.slots.keys().map(|n| (*n, 0)).collect();
        for targets in self.successors.values() {
            for t in targets {
                if let Some(d) = indegree.get_mut(t) {
                    *d += 1;
                }
            }
        }
        Self::kahn(&self.successors, indegree).ok_or_else(|| {
            TreeError::AmbiguousOrder("witnessed orders form a cycle".to_string())
        })
    }

    fn kahn(
        edges: &BTreeMap<SequenceNumber, BTreeSet<SequenceNumber>>,
        mut indegree: BTreeMap<SequenceNumber, usize>,
    ) -> Option<Vec<SequenceNumber>> {
        let total = indegree.len();
        let mut ready: BTreeSet<SequenceNumber> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| *n)
            .collect();
        let mut order = Vec::with_capacity(total);
        while let Some(current) = ready.pop_first() {
            order.push(current);
            if let Some(targets) = edges.get(&current) {
                for t in targets {
                    if let Some(d) = indegree.get_mut(t) {
                        *d -= 1;
                        if *d == 0 {
                            ready.insert(*t);
                        }
                    }
                }
            }
        }
        (order.len() == total).then_some(order)
    }

    /// Replay every witnessed path of `other` into this graph.
    ///
    /// Returns the slot each number of `other` was mapped to. Two numbers of
    /// `other` never map to the same slot.
    pub fn merge(
        &mut self,
        other: &SequenceGraph<D>,
    ) -> TreeResult<BTreeMap<SequenceNumber, SequenceNumber>> {
        let mut mapping: BTreeMap<SequenceNumber, SequenceNumber> = BTreeMap::new();

        for path in &other.paths {
            let mut items = Vec::with_capacity(path.len());
            for number in path {
                let data = other.slots.get(number).cloned().ok_or_else(|| {
                    TreeError::AmbiguousOrder(format!("path names unknown slot {}", number))
                })?;
                items.push(SequenceItem {
                    data,
                    anchor: mapping.get(number).copied(),
                });
            }
            let reserved: BTreeSet<SequenceNumber> = mapping.values().copied().collect();
            let alignment = self.sequence_reserving(&items, &reserved)?;
            for (number, assigned) in path.iter().zip(alignment.numbers) {
                mapping.insert(*number, assigned);
            }
        }

        for (number, data) in &other.slots {
            if !mapping.contains_key(number) {
                let assigned = self.allocate(data.clone());
                mapping.insert(*number, assigned);
            }
        }

        tracing::debug!(
            mapped = mapping.len(),
            slots = self.len(),
            "Merged sequence graph"
        );
        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(data: &[&str]) -> Vec<SequenceItem<String>> {
        data.iter().map(|d| SequenceItem::new(d.to_string())).collect()
    }

    fn sn(values: &[u32]) -> Vec<SequenceNumber> {
        values.iter().copied().map(SequenceNumber::new).collect()
    }

    #[test]
    fn test_first_list_gets_consecutive_numbers() {
        let mut graph = SequenceGraph::new();
        let alignment = graph.sequence(&items(&["x", "y", "z"])).unwrap();

        assert_eq!(alignment.numbers, sn(&[1, 2, 3]));
        assert_eq!(alignment.fresh, vec![0, 1, 2]);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.paths().len(), 1);
    }

    #[test]
    fn test_diverging_middle_element() {
        let mut graph = SequenceGraph::new();
        graph.sequence(&items(&["x", "y", "z"])).unwrap();
        let alignment = graph.sequence(&items(&["x", "w", "z"])).unwrap();

        assert_eq!(alignment.numbers, sn(&[1, 4, 3]));
        assert_eq!(alignment.fresh, vec![1]);

        assert!(graph.is_consistent(&sn(&[1, 2, 3])));
        assert!(graph.is_consistent(&sn(&[1, 4, 3])));
        assert!(graph.precedes(SequenceNumber::new(1), SequenceNumber::new(3)));
        assert_eq!(
            graph.uncertain_pairs(&sn(&[2, 4])),
            vec![(SequenceNumber::new(2), SequenceNumber::new(4))]
        );
        assert_eq!(graph.linearize(&sn(&[1, 2, 3, 4])).unwrap(), sn(&[1, 2, 4, 3]));
    }

    #[test]
    fn test_sequence_is_stable_for_known_list() {
        let mut graph = SequenceGraph::new();
        graph.sequence(&items(&["a", "b"])).unwrap();
        let before = graph.clone();
        let alignment = graph.sequence(&items(&["a", "b"])).unwrap();

        assert_eq!(alignment.numbers, sn(&[1, 2]));
        assert!(alignment.fresh.is_empty());
        assert_eq!(graph, before);
    }

    #[test]
    fn test_unconstrained_slot_is_reused() {
        let mut graph = SequenceGraph::new();
        graph.sequence(&items(&["x", "y"])).unwrap();
        graph.sequence(&items(&["w", "z"])).unwrap();

        let alignment = graph.sequence(&items(&["w", "x"])).unwrap();

        assert_eq!(alignment.numbers, sn(&[3, 1]));
        assert!(alignment.fresh.is_empty());
        assert!(graph.precedes(SequenceNumber::new(3), SequenceNumber::new(1)));
    }

    #[test]
    fn test_contradicting_order_gets_fresh_slot() {
        let mut graph = SequenceGraph::new();
        graph.sequence(&items(&["a", "a", "b"])).unwrap();
        let alignment = graph.sequence(&items(&["b", "a"])).unwrap();

        assert_eq!(alignment.numbers, sn(&[4, 1]));
        assert_eq!(alignment.fresh, vec![0]);
        assert_eq!(alignment.ties, 1);
        assert_eq!(graph.linearize(&sn(&[4, 1])).unwrap(), sn(&[4, 1]));
    }

    #[test]
    fn test_anchor_is_honored() {
        let mut graph = SequenceGraph::new();
        graph.sequence(&items(&["a", "a"])).unwrap();

        let alignment = graph
            .sequence(&[SequenceItem::anchored("a".to_string(), SequenceNumber::new(2))])
            .unwrap();
        assert_eq!(alignment.numbers, sn(&[2]));
    }

    #[test]
    fn test_foreign_anchor_is_ignored() {
        let mut graph = SequenceGraph::new();
        graph.sequence(&items(&["a"])).unwrap();

        let alignment = graph
            .sequence(&[SequenceItem::anchored("b".to_string(), SequenceNumber::new(1))])
            .unwrap();
        assert_eq!(alignment.numbers, sn(&[2]));
        assert_eq!(alignment.fresh, vec![0]);
    }

    #[test]
    fn test_contradicting_anchors_fail() {
        let mut graph = SequenceGraph::new();
        graph.sequence(&items(&["a", "b"])).unwrap();

        let reversed = [
            SequenceItem::anchored("b".to_string(), SequenceNumber::new(2)),
            SequenceItem::anchored("a".to_string(), SequenceNumber::new(1)),
        ];
        let err = graph.sequence(&reversed).unwrap_err();
        assert!(matches!(err, TreeError::AmbiguousOrder(_)));
    }

    #[test]
    fn test_linearize_unknown_slot() {
        let mut graph = SequenceGraph::new();
        graph.sequence(&items(&["a"])).unwrap();

        let err = graph.linearize(&sn(&[1, 9])).unwrap_err();
        assert!(matches!(err, TreeError::AmbiguousOrder(_)));
    }

    #[test]
    fn test_linearize_uses_transitive_constraints() {
        let mut graph = SequenceGraph::new();
        graph.sequence(&items(&["c", "b", "a"])).unwrap();

        assert_eq!(graph.linearize(&sn(&[3, 1])).unwrap(), sn(&[1, 3]));
    }

    #[test]
    fn test_empty_list_records_nothing() {
        let mut graph: SequenceGraph<String> = SequenceGraph::new();
        let alignment = graph.sequence(&[]).unwrap();

        assert!(alignment.numbers.is_empty());
        assert!(graph.paths().is_empty());
        assert!(graph.is_empty());
    }

    #[test]
    fn test_merge_maps_shared_slots() {
        let mut left = SequenceGraph::new();
        left.sequence(&items(&["x", "y", "z"])).unwrap();

        let mut right = SequenceGraph::new();
        right.sequence(&items(&["x", "w", "z"])).unwrap();

        let mapping = left.merge(&right).unwrap();

        assert_eq!(mapping[&SequenceNumber::new(1)], SequenceNumber::new(1));
        assert_eq!(mapping[&SequenceNumber::new(2)], SequenceNumber::new(4));
        assert_eq!(mapping[&SequenceNumber::new(3)], SequenceNumber::new(3));
        assert!(left.is_consistent(&sn(&[1, 4, 3])));
    }

    #[test]
    fn test_merge_keeps_duplicates_apart() {
        let mut left = SequenceGraph::new();
        left.sequence(&items(&["a"])).unwrap();

        let mut right = SequenceGraph::new();
        right.sequence(&items(&["a", "a"])).unwrap();

        let mapping = left.merge(&right).unwrap();
        assert_ne!(
            mapping[&SequenceNumber::new(1)],
            mapping[&SequenceNumber::new(2)]
        );
        assert_eq!(left.len(), 2);
    }
}
