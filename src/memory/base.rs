use rand::{seq::SliceRandom, thread_rng};

use crate::{ds::RingBuffer, error::AgentError};

use super::Transition;

/// A fixed-size memory storage for reinforcement learning experiences
///
/// This structure uses a ring buffer to store [transitions](Transition).
/// It automatically overwrites the oldest transition once it reaches its capacity.
///
/// ### Fields:
/// - `memory`: A `RingBuffer` that stores the transitions
/// - `batch_size`: The number of transitions drawn by [`sample`](ReplayMemory::sample)
#[derive(Debug, Clone)]
pub struct ReplayMemory {
    memory: RingBuffer<Transition>,
    batch_size: usize,
}

impl ReplayMemory {
    pub const DEFAULT_CAPACITY: usize = 1000;
    pub const DEFAULT_BATCH_SIZE: usize = 32;

    /// **Errors** if `batch_size` is zero or larger than `capacity`
    pub fn new(capacity: usize, batch_size: usize) -> Result<Self, AgentError> {
        if batch_size == 0 || batch_size > capacity {
            return Err(AgentError::InvalidBatchSize {
                batch_size,
                capacity,
            });
        }
        Ok(Self {
            memory: RingBuffer::new(capacity),
            batch_size,
        })
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.memory.capacity()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Add a new transition to the memory, evicting the oldest one if full
    pub fn push(&mut self, transition: Transition) {
        self.memory.push(transition);
    }

    /// Iterate over the stored transitions from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.memory.iter()
    }

    /// Sample a uniformly random batch of distinct transitions from the memory
    ///
    /// ### Returns
    /// - `Some(transitions)` if `batch_size` is less than or equal to the memory length
    /// - `None` otherwise
    pub fn sample(&self) -> Option<Vec<&Transition>> {
        if self.batch_size <= self.memory.len() {
            Some(
                self.memory
                    .view()
                    .choose_multiple(&mut thread_rng(), self.batch_size)
                    .collect(),
            )
        } else {
            None
        }
    }
}

impl Default for ReplayMemory {
    fn default() -> Self {
        Self {
            memory: RingBuffer::new(Self::DEFAULT_CAPACITY),
            batch_size: Self::DEFAULT_BATCH_SIZE,
        }
    }
}
