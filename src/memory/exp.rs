use crate::encoder::Features;

/// Represents a single experience or transition in the environment
///
/// States are stored already encoded, so a malformed observation is rejected when the
/// transition is recorded rather than when it is later sampled. This is the one place
/// [`Features`] are kept instead of being rebuilt from the observation on each use; since
/// encoding is pure, learning sees exactly what re-encoding the raw state would give.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// The state of the environment before taking the action
    pub state: Features,
    /// The index of the action taken in the given state
    pub action: usize,
    /// The reward received after taking the action
    pub reward: f32,
    /// The state of the environment after the action is taken
    pub next_state: Features,
}
