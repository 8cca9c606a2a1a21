use burn::prelude::*;

use crate::error::AgentError;

/// The actions and rewards of one episode, position-aligned
///
/// Each chosen action occupies one step. A step chosen by the policy carries the
/// log-probability of the sampled action, still attached to the autodiff graph; an
/// exploratory step carries `None`. Rewards are recorded separately and must arrive one
/// per step, in order.
#[derive(Debug, Clone)]
pub struct Trajectory<B: Backend> {
    log_probs: Vec<Option<Tensor<B, 1>>>,
    rewards: Vec<f32>,
}

impl<B: Backend> Default for Trajectory<B> {
    fn default() -> Self {
        Self {
            log_probs: Vec::new(),
            rewards: Vec::new(),
        }
    }
}

impl<B: Backend> Trajectory<B> {
    /// Number of actions recorded
    pub fn len(&self) -> usize {
        self.log_probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log_probs.is_empty() && self.rewards.is_empty()
    }

    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    pub fn log_probs(&self) -> &[Option<Tensor<B, 1>>] {
        &self.log_probs
    }

    /// Record an action chosen by the policy
    pub fn push_action(&mut self, log_prob: Tensor<B, 1>) {
        self.log_probs.push(Some(log_prob));
    }

    /// Record an exploratory action, which contributes a reward but no gradient
    pub fn push_exploration(&mut self) {
        self.log_probs.push(None);
    }

    /// Record the reward for the oldest action still waiting for one
    ///
    /// **Errors** with [`AgentError::UnexpectedReward`] if every action already has its reward
    pub fn push_reward(&mut self, reward: f32) -> Result<(), AgentError> {
        if self.rewards.len() >= self.log_probs.len() {
            return Err(AgentError::UnexpectedReward);
        }
        self.rewards.push(reward);
        Ok(())
    }

    /// Empty the trajectory, returning its contents
    ///
    /// **Errors** with [`AgentError::MisalignedTrajectory`] if the number of rewards differs from
    /// the number of actions; the trajectory is emptied either way.
    pub fn take(&mut self) -> Result<(Vec<Option<Tensor<B, 1>>>, Vec<f32>), AgentError> {
        let log_probs = std::mem::take(&mut self.log_probs);
        let rewards = std::mem::take(&mut self.rewards);
        if log_probs.len() != rewards.len() {
            return Err(AgentError::MisalignedTrajectory {
                actions: log_probs.len(),
                rewards: rewards.len(),
            });
        }
        Ok((log_probs, rewards))
    }
}

/// Compute the discounted return of every step, minus a baseline, in forward order
///
/// G<sub>t</sub> = r<sub>t</sub> + γG<sub>t+1</sub>, advantage<sub>t</sub> = G<sub>t</sub> - b
pub fn discounted_advantages(rewards: &[f32], gamma: f32, baseline: f32) -> Vec<f32> {
    let mut advantages = vec![0.0; rewards.len()];
    let mut ret = 0.0;
    for (i, &reward) in rewards.iter().enumerate().rev() {
        ret = reward + gamma * ret;
        advantages[i] = ret - baseline;
    }
    advantages
}
