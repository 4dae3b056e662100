//! Deterministic innovation numbers for synapse genes.
//!
//! Rather than a counter shared between genomes, a synapse's innovation is a
//! hash of the structure it encodes: `Hash(source_id, dest_id, occurrence)`,
//! where `occurrence` counts earlier synapse genes for the same pair in the
//! genome. Two lineages that grow the same synapse therefore agree on its
//! innovation, while re-growing a pair whose old synapse was disabled by a
//! split yields a fresh innovation.

use std::hash::{Hash, Hasher};

/// Multiplicative hasher with a finalising mix step.
#[derive(Default)]
struct InnovationHasher {
    state: u64,
}

impl Hasher for InnovationHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state = self
                .state
                .wrapping_mul(0x517c_c1b7_2722_0a95)
                .wrapping_add(u64::from(byte));
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        let mut h = self.state;
        h ^= h >> 33;
        h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
        h ^= h >> 33;
        h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
        h ^= h >> 33;
        h
    }
}

/// Innovation number for the `occurrence`-th synapse gene linking `source` to `dest`.
///
/// # Arguments
///
/// * `source` - Id of the source neuron
/// * `dest` - Id of the destination neuron
/// * `occurrence` - Number of synapse genes for this pair already in the genome
#[inline]
#[must_use]
pub fn synapse_innovation(source: u32, dest: u32, occurrence: usize) -> u64 {
    let mut hasher = InnovationHasher::default();
    source.hash(&mut hasher);
    dest.hash(&mut hasher);
    (occurrence as u64).hash(&mut hasher);
    hasher.finish()
}

/// Hands out neuron ids in increasing order within one genome lineage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NeuronIdAllocator {
    next: u32,
}

impl NeuronIdAllocator {
    /// Allocate the next id.
    pub fn allocate(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// The id the next call to [`allocate`](Self::allocate) will return.
    #[must_use]
    pub fn peek(&self) -> u32 {
        self.next
    }

    /// Allocator that continues after the larger of two lineages.
    #[must_use]
    pub fn merged(a: Self, b: Self) -> Self {
        Self {
            next: a.next.max(b.next),
        }
    }

    /// Make sure ids up to and including `id` are never handed out again.
    pub fn reserve_through(&mut self, id: u32) {
        self.next = self.next.max(id + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synapse_innovation_deterministic() {
        assert_eq!(synapse_innovation(1, 2, 0), synapse_innovation(1, 2, 0));
    }

    #[test]
    fn test_synapse_innovation_order_matters() {
        assert_ne!(synapse_innovation(1, 2, 0), synapse_innovation(2, 1, 0));
    }

    #[test]
    fn test_occurrence_yields_fresh_innovation() {
        assert_ne!(synapse_innovation(3, 7, 0), synapse_innovation(3, 7, 1));
    }

    #[test]
    fn test_synapse_innovation_distribution() {
        let innovations: Vec<u64> = (0..100).map(|i| synapse_innovation(i, i + 1, 0)).collect();
        let mut sorted = innovations.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), innovations.len(), "Should have no collisions");
    }

    #[test]
    fn test_allocator_is_monotonic() {
        let mut ids = NeuronIdAllocator::default();
        assert_eq!(ids.allocate(), 0);
        assert_eq!(ids.allocate(), 1);
        ids.reserve_through(9);
        assert_eq!(ids.allocate(), 10);
        ids.reserve_through(3);
        assert_eq!(ids.peek(), 11);
    }

    #[test]
    fn test_merged_allocator_skips_both_lineages() {
        let mut a = NeuronIdAllocator::default();
        let mut b = NeuronIdAllocator::default();
        for _ in 0..4 {
            a.allocate();
        }
        b.allocate();
        assert_eq!(NeuronIdAllocator::merged(a, b).peek(), 4);
    }
}
