use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use log::{debug, trace, warn};
use rand::{
    distributions::{Distribution, WeightedIndex},
    thread_rng,
};

use crate::{
    action::ActionSet,
    encoder::{ObservationValue, StateEncoder},
    ensure_interval, ensure_positive,
    env::{Environment, EpisodeReport},
    error::AgentError,
    exploration::{Choice, EpsilonGreedy},
    memory::{discounted_advantages, Trajectory},
    model::Policy,
    traits::ToTensor,
};

/// Configuration for the [`ReinforceAgent`]
#[derive(Config, Debug)]
pub struct ReinforceConfig {
    /// The length of the feature vector produced from each observation
    pub input_size: usize,
    #[config(default = 1e-3)]
    pub lr: f64,
    #[config(default = 0.99)]
    pub gamma: f32,
    #[config(default = 0.1)]
    pub epsilon: f32,
}

impl ReinforceConfig {
    pub fn validate(&self) -> Result<(), AgentError> {
        ensure_positive!(self.lr);
        ensure_interval!(self.gamma, 0.0, 1.0);
        ensure_interval!(self.epsilon, 0.0, 1.0);
        if self.input_size == 0 {
            return Err(AgentError::NotPositive {
                name: "input_size",
                value: 0.0,
            });
        }
        Ok(())
    }
}

/// A Monte Carlo policy gradient agent with a mean reward baseline
///
/// Over an episode the agent samples actions from its policy and records their
/// log-probabilities; the caller records one reward per action with
/// [`record_reward`](ReinforceAgent::record_reward). At the end of the episode
/// [`learn`](ReinforceAgent::learn) takes one gradient step on
/// `sum(-log_prob * (G - baseline))`, then sets the baseline to the episode's mean reward.
///
/// ### Generics
/// - `B`: A burn autodiff backend
/// - `M`: The [`Policy`] network
/// - `O`: An [`Optimizer`] for the policy network
/// - `A`: The action type of the [`ActionSet`]
pub struct ReinforceAgent<B, M, O, A>
where
    B: AutodiffBackend,
{
    policy_net: M,
    device: &'static B::Device,
    encoder: StateEncoder,
    actions: ActionSet<A>,
    optimizer: O,
    exploration: EpsilonGreedy,
    trajectory: Trajectory<B>,
    gamma: f32,
    lr: f64,
    baseline: f32,
    loss: Option<f32>,
}

impl<B, M, O, A> ReinforceAgent<B, M, O, A>
where
    B: AutodiffBackend,
    M: Policy<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    /// Initialize a new `ReinforceAgent`
    ///
    /// ### Arguments
    /// - `model` A [`Policy`] with one output per action
    /// - `optimizer` The [`Optimizer`] to train the policy with
    /// - `actions` The actions available to the agent
    /// - `config` A [`ReinforceConfig`] containing hyperparameters for the agent
    /// - `device` A static reference to the device used for the `model`
    ///
    /// **Errors** if the config is invalid or the model's output width differs from the number of actions
    pub fn new(
        model: M,
        optimizer: O,
        actions: ActionSet<A>,
        config: &ReinforceConfig,
        device: &'static B::Device,
    ) -> Result<Self, AgentError> {
        config.validate()?;

        let input = Tensor::<B, 2>::zeros([1, config.input_size], device);
        let width = model.forward(input).dims()[1];
        if width != actions.len() {
            return Err(AgentError::OutputWidth {
                expected: actions.len(),
                found: width,
            });
        }

        Ok(Self {
            policy_net: model,
            device,
            encoder: StateEncoder::new(config.input_size),
            actions,
            optimizer,
            exploration: EpsilonGreedy::new(config.epsilon)?,
            trajectory: Trajectory::default(),
            gamma: config.gamma,
            lr: config.lr,
            baseline: 0.0,
            loss: None,
        })
    }

    /// Choose an action for the given observation, returning its index in the action set
    ///
    /// With probability epsilon the action is uniformly random and contributes no gradient.
    /// Otherwise it is sampled from the policy and its log-probability is kept for
    /// [`learn`](ReinforceAgent::learn). Either way the action takes one step in the trajectory
    /// and awaits its reward.
    pub fn choose_action<T: ObservationValue>(
        &mut self,
        state: &[T],
    ) -> Result<usize, AgentError> {
        let features = self.encoder.encode(state)?;

        let action = match self.exploration.choose() {
            Choice::Explore => {
                self.trajectory.push_exploration();
                self.actions.random_index()
            }
            Choice::Exploit => {
                let input: Tensor<B, 2> = (&features).to_tensor(self.device);
                let probs: Tensor<B, 1> = self.policy_net.forward(input).squeeze(0);

                let weights = probs.clone().into_data().convert::<f32>().value;
                let action = WeightedIndex::new(&weights)?.sample(&mut thread_rng());
                self.actions.check(action)?;

                self.trajectory
                    .push_action(probs.slice([action..action + 1]).log());
                action
            }
        };

        trace!("chose action {action}");
        Ok(action)
    }

    /// Record the reward received for the oldest action still awaiting one
    ///
    /// **Errors** with [`AgentError::UnexpectedReward`] if there is no such action
    pub fn record_reward(&mut self, reward: f32) -> Result<(), AgentError> {
        self.trajectory.push_reward(reward)
    }

    /// Perform one policy gradient step over the recorded episode and start a new one
    ///
    /// The trajectory is always emptied. No gradient step is taken, and the baseline is left
    /// alone, when no recorded step was chosen by the policy.
    ///
    /// **Returns** the episode loss if a gradient step was taken
    ///
    /// **Errors** with [`AgentError::MisalignedTrajectory`] if the number of rewards does not match
    /// the number of actions; the episode is discarded.
    pub fn learn(&mut self) -> Result<Option<f32>, AgentError> {
        let (log_probs, rewards) = self.trajectory.take().map_err(|e| {
            warn!("discarding episode: {e}");
            e
        })?;

        let advantages = discounted_advantages(&rewards, self.gamma, self.baseline);
        let terms = log_probs
            .into_iter()
            .zip(advantages)
            .filter_map(|(log_prob, advantage)| log_prob.map(|lp| lp.neg() * advantage))
            .collect::<Vec<_>>();

        if terms.is_empty() {
            return Ok(None);
        }

        let loss = Tensor::cat(terms, 0).sum();
        let grads = GradientsParams::from_grads(loss.backward(), &self.policy_net);
        self.policy_net = self
            .optimizer
            .step(self.lr, self.policy_net.clone(), grads);

        let loss = loss.into_scalar().elem::<f32>();
        self.baseline = rewards.iter().sum::<f32>() / rewards.len() as f32;
        self.loss = Some(loss);
        debug!(
            "learned from {} steps, loss {loss}, baseline {}",
            rewards.len(),
            self.baseline
        );

        Ok(Some(loss))
    }

    /// Deploy the agent into the environment for one episode, learning at its end
    pub fn go<E: Environment>(&mut self, env: &mut E) -> Result<EpisodeReport, AgentError> {
        let mut report = EpisodeReport::default();
        let mut state = env.reset();

        loop {
            let action = self.choose_action(&state)?;
            let (next_state, reward, done) = env.step(action);
            self.record_reward(reward)?;

            report.steps += 1;
            report.reward += reward;

            if done {
                break;
            }
            state = next_state;
        }

        report.loss = self.learn()?;
        Ok(report)
    }
}

impl<B, M, O, A> ReinforceAgent<B, M, O, A>
where
    B: AutodiffBackend,
{
    pub fn policy_net(&self) -> &M {
        &self.policy_net
    }

    pub fn actions(&self) -> &ActionSet<A> {
        &self.actions
    }

    pub fn trajectory(&self) -> &Trajectory<B> {
        &self.trajectory
    }

    /// The mean reward of the last episode learned from
    pub fn baseline(&self) -> f32 {
        self.baseline
    }

    /// The loss of the most recent gradient step, if any
    pub fn loss(&self) -> Option<f32> {
        self.loss
    }

    pub fn epsilon(&self) -> f32 {
        self.exploration.epsilon()
    }
}
