use crate::encoder::ObservationValue;

/// Represents the environment an agent interacts with, one discrete action at a time
///
/// Observations are sequences of scalars that the agents encode with a
/// [`StateEncoder`](crate::encoder::StateEncoder); actions are indices into the agent's
/// [`ActionSet`](crate::action::ActionSet).
pub trait Environment {
    /// A single entry of an observation
    type Value: ObservationValue;

    /// Reset the environment to an initial state
    ///
    /// **Returns** the initial observation
    fn reset(&mut self) -> Vec<Self::Value>;

    /// Update the environment in response to an action taken by an agent
    ///
    /// **Returns** `(next_state, reward, done)`
    fn step(&mut self, action: usize) -> (Vec<Self::Value>, f32, bool);
}

/// Summary of one episode run by an agent's `go`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpisodeReport {
    /// Number of actions taken
    pub steps: usize,
    /// Sum of rewards received
    pub reward: f32,
    /// The most recent training loss observed during the episode
    pub loss: Option<f32>,
}
