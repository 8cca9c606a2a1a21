mod base;
mod exp;
mod trajectory;

pub use base::ReplayMemory;
pub use exp::*;
pub use trajectory::{discounted_advantages, Trajectory};
