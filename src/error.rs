use rand::distributions::WeightedError;
use thiserror::Error;

use crate::encoder::EncodeError;

/// Errors raised by the agents and their components
#[derive(Debug, Error)]
pub enum AgentError {
    /// An observation could not be converted into a feature vector
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("Invalid value for `{name}`: {value}. Must be in the interval [{min}, {max}].")]
    OutOfInterval {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid value for `{name}`: {value}. Must be positive.")]
    NotPositive { name: &'static str, value: f64 },

    #[error("The action set must contain at least one action")]
    EmptyActionSet,

    #[error("Batch size {batch_size} must be in the interval [1, {capacity}]")]
    InvalidBatchSize { batch_size: usize, capacity: usize },

    #[error("Action index {index} is out of range for {len} actions")]
    InvalidAction { index: usize, len: usize },

    /// The network does not produce exactly one output per action
    #[error("Network has {found} outputs but the action set holds {expected} actions")]
    OutputWidth { expected: usize, found: usize },

    /// The episode's rewards do not line up with the actions that were chosen
    #[error("Trajectory holds {actions} actions but {rewards} rewards")]
    MisalignedTrajectory { actions: usize, rewards: usize },

    #[error("Reward recorded without a preceding action")]
    UnexpectedReward,

    /// The policy network produced something that is not a probability distribution
    #[error("Cannot sample an action from the policy output: {0}")]
    Sampling(#[from] WeightedError),
}
