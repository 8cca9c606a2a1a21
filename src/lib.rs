//! Two discrete-action reinforcement learning agents built on [burn](https://burn.dev):
//!
//! - [`DoubleDqnAgent`](algo::DoubleDqnAgent): Double Q-learning with a frozen target network
//!   and uniform experience replay
//! - [`ReinforceAgent`](algo::ReinforceAgent): Monte Carlo policy gradient with a running
//!   mean reward baseline
//!
//! Both agents take raw observations, encode them with a [`StateEncoder`](encoder::StateEncoder),
//! and return an index into their [`ActionSet`](action::ActionSet). The environment loop is
//! left to the caller, see [`Environment`](env::Environment) for a minimal driver.

/// Discrete action sets
pub mod action;

/// Implemented RL algorithms
pub mod algo;

/// Data structures
pub mod ds;

/// Observation encoding
pub mod encoder;

/// Environment
pub mod env;

/// Errors
pub mod error;

/// Exploration policies
pub mod exploration;

/// Experience replay and episode trajectories
pub mod memory;

/// Function approximators
pub mod model;

/// Tensor conversions
pub mod traits;

mod util;
