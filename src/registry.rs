//! Ranked, priority-deduplicated producer set with neighbor lookup.

use log::debug;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::ops::Bound::{Excluded, Unbounded};

use crate::Producer;

/// Producers keyed and sorted by priority. At most one producer per priority level:
/// the first one registered for a level wins and later ones are dropped without error.
#[derive(Clone, Debug, Default)]
pub struct ProducerRegistry {
    by_priority: BTreeMap<u8, Producer>,
}

impl ProducerRegistry {
    pub fn register<I>(producers: I) -> Self
    where
        I: IntoIterator<Item = Producer>,
    {
        let mut by_priority = BTreeMap::new();
        for producer in producers {
            match by_priority.entry(producer.priority()) {
                Entry::Vacant(slot) => {
                    slot.insert(producer);
                }
                Entry::Occupied(_) => {
                    debug!(
                        "Dropping producer with duplicate priority {}",
                        producer.priority()
                    );
                }
            }
        }
        Self { by_priority }
    }

    /// Producer with the smallest priority strictly above `p`'s.
    pub fn neighbor_above(&self, p: &Producer) -> Option<&Producer> {
        self.by_priority
            .range((Excluded(p.priority()), Unbounded))
            .next()
            .map(|(_, n)| n)
    }

    /// Producer with the largest priority strictly below `p`'s.
    pub fn neighbor_below(&self, p: &Producer) -> Option<&Producer> {
        self.by_priority
            .range(..p.priority())
            .next_back()
            .map(|(_, n)| n)
    }

    pub fn count(&self) -> usize {
        self.by_priority.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_priority.is_empty()
    }

    /// Ascending by priority.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Producer> {
        self.by_priority.values()
    }

    pub fn get(&self, priority: u8) -> Option<&Producer> {
        self.by_priority.get(&priority)
    }

    /// Worker slots `start` will request: one per priority point.
    pub fn total_priority(&self) -> usize {
        self.iter().map(|p| usize::from(p.priority())).sum()
    }

    /// Items still queued across all producers.
    pub fn pending(&self) -> usize {
        self.iter().map(|p| p.queue().len()).sum()
    }
}
