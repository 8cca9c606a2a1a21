/// Double Deep Q Network with experience replay
pub mod dqn;

/// Monte Carlo policy gradient with a mean reward baseline
pub mod reinforce;

pub use dqn::{DoubleDqnAgent, DoubleDqnConfig};
pub use reinforce::{ReinforceAgent, ReinforceConfig};
