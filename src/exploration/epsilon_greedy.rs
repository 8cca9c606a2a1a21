use rand::{thread_rng, Rng};

use crate::{ensure_interval, error::AgentError};

use super::Choice;

/// Epsilon greedy exploration policy with a fixed epsilon threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonGreedy {
    epsilon: f32,
}

impl EpsilonGreedy {
    /// **Errors** if `epsilon` is not in the interval `[0,1]`
    pub fn new(epsilon: f32) -> Result<Self, AgentError> {
        ensure_interval!(epsilon, 0.0, 1.0);
        Ok(Self { epsilon })
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Explore with probability `epsilon`, otherwise exploit
    pub fn choose(&self) -> Choice {
        if thread_rng().gen::<f32>() < self.epsilon {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsilon_greedy_extremes() {
        let always = EpsilonGreedy::new(1.0).unwrap();
        let never = EpsilonGreedy::new(0.0).unwrap();
        for _ in 0..1000 {
            assert_eq!(always.choose(), Choice::Explore);
            assert_eq!(never.choose(), Choice::Exploit);
        }
    }

    #[test]
    fn epsilon_greedy_rate() {
        let policy = EpsilonGreedy::new(0.25).unwrap();
        let explored = (0..10_000)
            .filter(|_| policy.choose() == Choice::Explore)
            .count();
        // 0.25 +/- ~9 standard deviations
        assert!((2000..3000).contains(&explored), "explored {explored} times");
    }

    #[test]
    fn epsilon_greedy_rejects_out_of_range() {
        assert!(EpsilonGreedy::new(1.01).is_err());
        assert!(EpsilonGreedy::new(-0.5).is_err());
    }
}
