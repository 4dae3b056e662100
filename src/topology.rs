//! Graph topology of a network genome in CSR format.
//!
//! The phenotype compiler needs each neuron's depth (longest path from a
//! source, sensors at depth 0). GRNs may contain recurrent synapses, so depth
//! is computed on the graph with its back edges removed: a DFS colours the
//! graph, every edge into a node still on the DFS path is dropped, and
//! Kahn's algorithm runs on what remains.
//!
//! ## Determinism
//!
//! Nodes are ordered by neuron id and edges by innovation number, so the DFS
//! and therefore the set of back edges is identical for identical genomes.

use std::collections::VecDeque;

use crate::gene::NeuronType;
use crate::network::NetworkGenome;

/// CSR-format snapshot of a genome's enabled synapses.
#[derive(Debug, Clone)]
pub struct GraphTopology {
    /// Neuron id of each dense index, ascending.
    ids: Vec<u32>,
    /// CSR offsets for outgoing edges. Length = node_count + 1.
    fwd_offsets: Vec<usize>,
    /// `fwd_targets[fwd_offsets[i]..fwd_offsets[i + 1]]` are successors of node i.
    fwd_targets: Vec<usize>,
    /// CSR offsets for incoming edges. Length = node_count + 1.
    rev_offsets: Vec<usize>,
    /// `rev_sources[rev_offsets[i]..rev_offsets[i + 1]]` are predecessors of node i.
    rev_sources: Vec<usize>,
}

impl GraphTopology {
    /// Build the topology of a genome's enabled synapses.
    ///
    /// Synapses into sensors and synapses touching unknown neurons are ignored.
    #[must_use]
    pub fn from_genome(genome: &NetworkGenome) -> Self {
        let mut ids: Vec<u32> = genome.neurons().map(|n| n.id).collect();
        ids.sort_unstable();
        ids.dedup();
        let node_count = ids.len();
        let index_of = |id: u32| ids.binary_search(&id).ok();

        let mut edges: Vec<(u64, usize, usize)> = genome
            .synapses
            .iter()
            .filter(|s| s.enabled)
            .filter(|s| {
                genome
                    .neuron(s.dest)
                    .is_some_and(|n| n.neuron_type != NeuronType::Sensor)
            })
            .filter_map(|s| Some((s.innovation, index_of(s.source)?, index_of(s.dest)?)))
            .collect();
        edges.sort_by_key(|&(innovation, _, _)| innovation);

        let (fwd_offsets, fwd_targets) =
            build_csr(node_count, edges.iter().map(|&(_, from, to)| (from, to)));
        let (rev_offsets, rev_sources) =
            build_csr(node_count, edges.iter().map(|&(_, from, to)| (to, from)));

        Self {
            ids,
            fwd_offsets,
            fwd_targets,
            rev_offsets,
            rev_sources,
        }
    }

    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    /// Neuron id stored at a dense index.
    #[inline]
    pub fn neuron_id(&self, idx: usize) -> Option<u32> {
        self.ids.get(idx).copied()
    }

    /// Dense index of a neuron id.
    #[inline]
    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.ids.binary_search(&id).ok()
    }

    #[inline]
    pub fn successors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.fwd_targets[self.fwd_offsets[idx]..self.fwd_offsets[idx + 1]]
            .iter()
            .copied()
    }

    #[inline]
    pub fn predecessors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.rev_sources[self.rev_offsets[idx]..self.rev_offsets[idx + 1]]
            .iter()
            .copied()
    }

    /// Whether the enabled synapses contain a cycle (Kahn's algorithm).
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        let no_back_edges = vec![false; self.fwd_targets.len()];
        self.longest_paths(&no_back_edges).1 != self.node_count()
    }

    /// Depth of every node by dense index.
    ///
    /// Depth is the longest path from a node without predecessors, computed
    /// after discarding back edges, so it is defined for recurrent graphs too.
    #[must_use]
    pub fn compute_depths(&self) -> Vec<u32> {
        let back_edges = self.back_edges();
        let (depths, processed) = self.longest_paths(&back_edges);
        debug_assert_eq!(processed, self.node_count());
        depths
    }

    /// Kahn's algorithm over forward edges not flagged in `skip`.
    ///
    /// Returns depths and the number of nodes processed.
    fn longest_paths(&self, skip: &[bool]) -> (Vec<u32>, usize) {
        let node_count = self.node_count();
        let mut in_degree = vec![0usize; node_count];
        for (edge, &target) in self.fwd_targets.iter().enumerate() {
            if !skip[edge] {
                in_degree[target] += 1;
            }
        }

        let mut depths = vec![0u32; node_count];
        let mut queue: VecDeque<usize> = (0..node_count).filter(|&i| in_degree[i] == 0).collect();

        let mut processed = 0;
        while let Some(u) = queue.pop_front() {
            processed += 1;
            for edge in self.fwd_offsets[u]..self.fwd_offsets[u + 1] {
                if skip[edge] {
                    continue;
                }
                let v = self.fwd_targets[edge];
                depths[v] = depths[v].max(depths[u].saturating_add(1));
                in_degree[v] -= 1;
                if in_degree[v] == 0 {
                    queue.push_back(v);
                }
            }
        }
        (depths, processed)
    }

    /// Flag every forward edge that closes a cycle, using iterative DFS.
    fn back_edges(&self) -> Vec<bool> {
        let node_count = self.node_count();
        let mut flagged = vec![false; self.fwd_targets.len()];
        // 0 = unvisited, 1 = on the current path, 2 = finished
        let mut color = vec![0u8; node_count];
        let mut stack: Vec<(usize, usize)> = Vec::with_capacity(node_count);

        // Start from sources first so that a cycle reachable from a sensor is
        // entered the way signals flow.
        let starts = (0..node_count)
            .filter(|&i| self.predecessors(i).next().is_none())
            .chain(0..node_count);

        for start in starts {
            if color[start] != 0 {
                continue;
            }
            color[start] = 1;
            stack.push((start, self.fwd_offsets[start]));

            while let Some(top) = stack.last_mut() {
                let (node, edge) = *top;
                if edge == self.fwd_offsets[node + 1] {
                    color[node] = 2;
                    stack.pop();
                    continue;
                }
                top.1 += 1;

                let neighbor = self.fwd_targets[edge];
                match color[neighbor] {
                    1 => flagged[edge] = true,
                    0 => {
                        color[neighbor] = 1;
                        stack.push((neighbor, self.fwd_offsets[neighbor]));
                    }
                    _ => {}
                }
            }
        }
        flagged
    }
}

/// Build CSR offsets and targets from `(row, column)` pairs, preserving input order within a row.
fn build_csr(
    node_count: usize,
    pairs: impl Iterator<Item = (usize, usize)> + Clone,
) -> (Vec<usize>, Vec<usize>) {
    let mut counts = vec![0usize; node_count];
    for (row, _) in pairs.clone() {
        counts[row] += 1;
    }

    let mut offsets = Vec::with_capacity(node_count + 1);
    offsets.push(0);
    let mut total = 0;
    for &count in &counts {
        total += count;
        offsets.push(total);
    }

    let mut targets = vec![0usize; total];
    let mut write_pos = offsets[..node_count].to_vec();
    for (row, column) in pairs {
        targets[write_pos[row]] = column;
        write_pos[row] += 1;
    }
    (offsets, targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Activation;

    /// sensor 0 -> hidden 1 -> output 2, plus sensor 0 -> output 2.
    fn chain() -> NetworkGenome {
        let mut genome = NetworkGenome::new(0.1);
        let s = genome.add_sensor("In", Activation::Linear).id;
        let h = genome.add_hidden(Activation::Tanh).id;
        let o = genome.add_output("Out", Activation::Linear).id;
        genome.add_synapse(s, h, 1.0);
        genome.add_synapse(h, o, 1.0);
        genome.add_synapse(s, o, 0.5);
        genome
    }

    #[test]
    fn test_topology_basic() {
        let topo = GraphTopology::from_genome(&chain());
        assert_eq!(topo.node_count(), 3);
        assert!(!topo.has_cycle());
        assert_eq!(topo.successors(0).count(), 2);
        assert_eq!(topo.predecessors(2).count(), 2);
    }

    #[test]
    fn test_topology_depths() {
        let topo = GraphTopology::from_genome(&chain());
        assert_eq!(topo.compute_depths(), vec![0, 1, 2]);
    }

    #[test]
    fn test_disabled_synapses_are_ignored() {
        let mut genome = chain();
        genome.synapses[1].enabled = false;
        let topo = GraphTopology::from_genome(&genome);
        assert_eq!(topo.compute_depths(), vec![0, 1, 1]);
    }

    #[test]
    fn test_recurrent_depths_are_finite() {
        let mut genome = chain();
        // output feeds back into the hidden neuron
        genome.add_synapse(2, 1, 0.3);
        let topo = GraphTopology::from_genome(&genome);
        assert!(topo.has_cycle());
        let depths = topo.compute_depths();
        assert_eq!(depths[0], 0);
        // exactly one of the two cycle edges is dropped
        assert!(depths == vec![0, 1, 2] || depths == vec![0, 2, 1]);
    }

    #[test]
    fn test_self_loop() {
        let mut genome = chain();
        genome.add_synapse(1, 1, 0.3);
        let topo = GraphTopology::from_genome(&genome);
        assert!(topo.has_cycle());
        assert_eq!(topo.compute_depths(), vec![0, 1, 2]);
    }

    #[test]
    fn test_index_lookup() {
        let topo = GraphTopology::from_genome(&chain());
        assert_eq!(topo.index_of(2), Some(2));
        assert_eq!(topo.neuron_id(1), Some(1));
        assert_eq!(topo.index_of(99), None);
    }
}
