use std::ops::Index;

use rand::{thread_rng, Rng};

use crate::error::AgentError;

/// The finite, ordered set of discrete actions available to an agent
///
/// Agents choose actions by index into this set; use [`ActionSet::get`] or indexing to resolve
/// an index to the action itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSet<A> {
    actions: Vec<A>,
}

impl<A> ActionSet<A> {
    /// **Errors** if `actions` is empty
    pub fn new(actions: Vec<A>) -> Result<Self, AgentError> {
        if actions.is_empty() {
            return Err(AgentError::EmptyActionSet);
        }
        Ok(Self { actions })
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&A> {
        self.actions.get(index)
    }

    pub fn as_slice(&self) -> &[A] {
        &self.actions
    }

    /// Draw a uniformly random index into the set
    pub fn random_index(&self) -> usize {
        thread_rng().gen_range(0..self.actions.len())
    }

    /// **Errors** with [`AgentError::InvalidAction`] if `index` is out of range
    pub fn check(&self, index: usize) -> Result<usize, AgentError> {
        if index < self.actions.len() {
            Ok(index)
        } else {
            Err(AgentError::InvalidAction {
                index,
                len: self.actions.len(),
            })
        }
    }
}

impl ActionSet<usize> {
    /// An action set of the indices `0..n`
    pub fn indices(n: usize) -> Result<Self, AgentError> {
        Self::new((0..n).collect())
    }
}

impl<A> Index<usize> for ActionSet<A> {
    type Output = A;

    fn index(&self, index: usize) -> &Self::Output {
        &self.actions[index]
    }
}

impl<A> TryFrom<Vec<A>> for ActionSet<A> {
    type Error = AgentError;

    fn try_from(actions: Vec<A>) -> Result<Self, Self::Error> {
        Self::new(actions)
    }
}
