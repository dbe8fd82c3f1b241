use crate::Innovation;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::collections::hash_map::{Entry, HashMap};

/// Identities produced by splitting a connection:
/// `(new node, connection into the new node, connection out of the new node)`.
pub type SplitRecord = (Innovation, Innovation, Innovation);

/// An `InnovationRegistry` keeps track of structural innovations
/// over a whole run, so that identical mutations arising in
/// unrelated genomes are given identical historical markers.
///
/// For connection innovations the source and target nodes identify
/// the mutation; every distinct pair is given one marker for the
/// duration of the run.
///
/// For node innovations the split connection identifies the mutation,
/// and the new node id plus the markers of the two replacement
/// connections are recorded, in that order.
///
/// The registry is append-only, and is meant to be owned by a single
/// run and passed explicitly to every operator that needs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnovationRegistry {
    next_marker: Innovation,
    next_node: Innovation,
    connection_markers: HashMap<(Innovation, Innovation), Innovation, RandomState>,
    marker_endpoints: Vec<(Innovation, Innovation)>,
    splits: HashMap<Innovation, SplitRecord, RandomState>,
}

impl InnovationRegistry {
    /// Creates a new registry for genomes with the specified
    /// number of inputs and outputs.
    ///
    /// Node ids `0..input_count + output_count` are reserved for
    /// the fixed input and output nodes. Every input→output pair
    /// is pre-registered: the connection from input `i` to output
    /// index `o` gets marker `o + i ⨯ output_count`. Thus, connections
    /// created through mutation start at marker `input_count ⨯ output_count`.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::InnovationRegistry;
    ///
    /// let registry = InnovationRegistry::new(3, 2);
    ///
    /// assert_eq!(registry.connection_marker(1, 4), Some(3));
    /// assert_eq!(registry.max_marker(), Some(5));
    /// assert_eq!(registry.next_node_id(), 5);
    /// ```
    pub fn new(input_count: usize, output_count: usize) -> InnovationRegistry {
        let mut registry = InnovationRegistry {
            next_marker: 0,
            next_node: input_count + output_count,
            connection_markers: HashMap::default(),
            marker_endpoints: Vec::with_capacity(input_count * output_count),
            splits: HashMap::default(),
        };
        for i in 0..input_count {
            for o in 0..output_count {
                registry.get_or_create_connection_marker(i, o + input_count);
            }
        }
        registry
    }

    /// Returns the marker previously assigned to the `source → target`
    /// connection, or assigns and records the next available one.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::InnovationRegistry;
    ///
    /// let mut registry = InnovationRegistry::new(2, 1);
    ///
    /// let marker = registry.get_or_create_connection_marker(0, 7);
    /// assert_eq!(marker, 2);
    /// // Asking again yields the same marker.
    /// assert_eq!(registry.get_or_create_connection_marker(0, 7), marker);
    /// ```
    pub fn get_or_create_connection_marker(
        &mut self,
        source: Innovation,
        target: Innovation,
    ) -> Innovation {
        match self.connection_markers.entry((source, target)) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let marker = self.next_marker;
                entry.insert(marker);
                self.marker_endpoints.push((source, target));
                self.next_marker += 1;
                marker
            }
        }
    }

    /// Returns the identities for splitting the connection with the
    /// specified marker, in the format `(new node, marker in, marker out)`.
    ///
    /// If the same connection has been split before during the run,
    /// the recorded identities are returned, so that identical splits
    /// across the population converge onto identical genes.
    ///
    /// # Panics
    /// This function panics if `marker` was never assigned
    /// by this registry.
    ///
    /// # Examples
    /// ```
    /// use ferroneat::genomics::InnovationRegistry;
    ///
    /// let mut registry = InnovationRegistry::new(1, 1);
    ///
    /// let (node, marker_in, marker_out) = registry.split_connection(0);
    /// assert_eq!(node, 2);
    /// assert_eq!(registry.marker_endpoints(marker_in), Some((0, 2)));
    /// assert_eq!(registry.marker_endpoints(marker_out), Some((2, 1)));
    ///
    /// assert_eq!(registry.split_connection(0), (node, marker_in, marker_out));
    /// ```
    pub fn split_connection(&mut self, marker: Innovation) -> SplitRecord {
        match self.splits.get(&marker) {
            Some(record) => *record,
            None => self.fresh_split(marker),
        }
    }

    /// Allocates new identities for splitting the connection with the
    /// specified marker, even if it has been split before, and records
    /// them as the latest split of that connection.
    ///
    /// This is needed when the genome performing the split already
    /// contains the previously recorded node (it split the same
    /// connection earlier and the connection was re-enabled since),
    /// which would otherwise produce duplicate genes within the genome.
    ///
    /// # Panics
    /// This function panics if `marker` was never assigned
    /// by this registry.
    pub fn fresh_split(&mut self, marker: Innovation) -> SplitRecord {
        let (source, target) = self.marker_endpoints[marker];
        let new_node = self.next_node;
        self.next_node += 1;

        let marker_in = self.get_or_create_connection_marker(source, new_node);
        let marker_out = self.get_or_create_connection_marker(new_node, target);
        let record = (new_node, marker_in, marker_out);

        self.splits.insert(marker, record);
        record
    }

    /// Returns the marker assigned to the `source → target` connection,
    /// if any.
    pub fn connection_marker(&self, source: Innovation, target: Innovation) -> Option<Innovation> {
        self.connection_markers.get(&(source, target)).copied()
    }

    /// Returns the endpoints of the connection with the
    /// specified marker, if it has been assigned.
    pub fn marker_endpoints(&self, marker: Innovation) -> Option<(Innovation, Innovation)> {
        self.marker_endpoints.get(marker).copied()
    }

    /// Returns the identities recorded for the latest split
    /// of the connection with the specified marker, if any.
    pub fn recorded_split(&self, marker: Innovation) -> Option<SplitRecord> {
        self.splits.get(&marker).copied()
    }

    /// Returns the highest marker assigned so far.
    pub fn max_marker(&self) -> Option<Innovation> {
        self.next_marker.checked_sub(1)
    }

    /// Returns the id the next split will give its new node.
    pub fn next_node_id(&self) -> Innovation {
        self.next_node
    }

    /// Returns an iterator over the complete record of
    /// connection innovations, in the format
    /// `((source node, target node), marker)`.
    /// No ordering is guaranteed.
    pub fn connection_history(
        &self,
    ) -> impl Iterator<Item = (&(Innovation, Innovation), &Innovation)> {
        self.connection_markers.iter()
    }

    /// Returns an iterator over the complete record of
    /// node innovations, in the format
    /// `(split marker, (new node, marker in, marker out))`.
    /// No ordering is guaranteed.
    pub fn split_history(&self) -> impl Iterator<Item = (&Innovation, &SplitRecord)> {
        self.splits.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_markers() {
        let registry = InnovationRegistry::new(3, 2);
        for i in 0..3 {
            for o in 0..2 {
                assert_eq!(registry.connection_marker(i, o + 3), Some(o + i * 2));
            }
        }
        assert_eq!(registry.connection_history().count(), 6);
    }

    #[test]
    fn markers_are_monotonic_and_stable() {
        let mut registry = InnovationRegistry::new(1, 1);
        let a = registry.get_or_create_connection_marker(0, 5);
        let b = registry.get_or_create_connection_marker(5, 1);
        let c = registry.get_or_create_connection_marker(0, 5);
        assert_eq!((a, b, c), (1, 2, 1));
        assert_eq!(registry.max_marker(), Some(2));
        assert_eq!(registry.marker_endpoints(b), Some((5, 1)));
    }

    #[test]
    fn split_is_shared() {
        let mut registry = InnovationRegistry::new(2, 1);
        let first = registry.split_connection(1);
        let second = registry.split_connection(1);
        assert_eq!(first, second);
        assert_eq!(registry.next_node_id(), 4);
        assert_eq!(registry.split_history().count(), 1);
    }

    #[test]
    fn fresh_split_replaces_record() {
        let mut registry = InnovationRegistry::new(1, 1);
        let first = registry.split_connection(0);
        let fresh = registry.fresh_split(0);
        assert_ne!(first.0, fresh.0);
        assert_ne!(first.1, fresh.1);
        assert_ne!(first.2, fresh.2);
        assert_eq!(registry.recorded_split(0), Some(fresh));
        assert_eq!(registry.split_connection(0), fresh);
    }

    #[test]
    fn different_splits_get_different_nodes() {
        let mut registry = InnovationRegistry::new(2, 1);
        let (node_a, ..) = registry.split_connection(0);
        let (node_b, ..) = registry.split_connection(1);
        assert_ne!(node_a, node_b);
    }

    #[test]
    #[should_panic]
    fn split_unknown_marker() {
        let mut registry = InnovationRegistry::new(1, 1);
        registry.split_connection(99);
    }
}
