use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use log::{debug, trace};
use nn::loss::{MseLoss, Reduction};

use crate::{
    action::ActionSet,
    encoder::{Features, ObservationValue, StateEncoder},
    ensure_interval, ensure_positive,
    env::{Environment, EpisodeReport},
    error::AgentError,
    exploration::{Choice, EpsilonGreedy},
    memory::{ReplayMemory, Transition},
    model::QFunction,
    traits::ToTensor,
};

/// Configuration for the [`DoubleDqnAgent`]
#[derive(Config, Debug)]
pub struct DoubleDqnConfig {
    /// The length of the feature vector produced from each observation
    pub input_size: usize,
    /// The learning rate for the optimizer
    #[config(default = 1e-3)]
    pub lr: f64,
    /// The discount factor
    #[config(default = 0.99)]
    pub gamma: f32,
    /// The probability of taking a uniformly random action
    #[config(default = 0.1)]
    pub epsilon: f32,
    /// The maximum number of transitions kept in the replay memory
    #[config(default = 1000)]
    pub memory_capacity: usize,
    /// The number of transitions learned from per call to `learn`
    #[config(default = 32)]
    pub batch_size: usize,
}

impl DoubleDqnConfig {
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

/// A Double Deep Q Network agent with experience replay
///
/// The online network picks greedy actions and is trained by temporal difference; the target
/// network is a frozen snapshot of the online network that only changes through
/// [`update_target_network`](DoubleDqnAgent::update_target_network).
///
/// ### Generics
/// - `B`: A burn autodiff backend
/// - `M`: The [`QFunction`] used for the online and target networks
/// - `O`: An [`Optimizer`] for the online network
/// - `A`: The action type of the [`ActionSet`]
///
/// ### Example
/// ```ignore
/// let model = QNetworkConfig::new(4, 2).init(&*DEVICE);
/// let actions = ActionSet::indices(2)?;
/// let mut agent = DoubleDqnAgent::new(
///     model,
///     AdamConfig::new().init(),
///     actions,
///     &DoubleDqnConfig::new(4),
///     &*DEVICE,
/// )?;
/// ```
pub struct DoubleDqnAgent<B, M, O, A>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    online_net: M,
    target_net: M::InnerModule,
    device: &'static B::Device,
    encoder: StateEncoder,
    actions: ActionSet<A>,
    memory: ReplayMemory,
    optimizer: O,
    loss_fn: MseLoss<B>,
    exploration: EpsilonGreedy,
    gamma: f32,
    lr: f64,
    loss: Option<f32>,
}

impl<B, M, O, A> DoubleDqnAgent<B, M, O, A>
where
    B: AutodiffBackend,
    M: QFunction<B> + AutodiffModule<B>,
    M::InnerModule: QFunction<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    /// Initialize a new `DoubleDqnAgent`
    ///
    /// ### Arguments
    /// - `model` A [`QFunction`] with one output per action, copied to form the target network
    /// - `optimizer` The [`Optimizer`] to train the online network with
    /// - `actions` The actions available to the agent
    /// - `config` A [`DoubleDqnConfig`] containing hyperparameters for the agent
    /// - `device` A static reference to the device used for the `model`
    ///
    /// **Errors** if the config is invalid or the model's output width differs from the number of actions
    pub fn new(
        model: M,
        optimizer: O,
        actions: ActionSet<A>,
        config: &DoubleDqnConfig,
        device: &'static B::Device,
    ) -> Result<Self, AgentError> {
        config.validate()?;

        let target_net = model.valid();
        let input = Tensor::<B::InnerBackend, 2>::zeros([1, config.input_size], device);
        let width = target_net.forward(input).dims()[1];
        if width != actions.len() {
            return Err(AgentError::OutputWidth {
                expected: actions.len(),
                found: width,
            });
        }

        Ok(Self {
            target_net,
            online_net: model,
            device,
            encoder: StateEncoder::new(config.input_size),
            actions,
            memory: ReplayMemory::new(config.memory_capacity, config.batch_size)?,
            optimizer,
            loss_fn: MseLoss::new(),
            exploration: EpsilonGreedy::new(config.epsilon)?,
            gamma: config.gamma,
            lr: config.lr,
            loss: None,
        })
    }

    /// Choose an action for the given observation, returning its index in the action set
    ///
    /// With probability epsilon the action is uniformly random, otherwise it maximizes the
    /// online network's action values.
    pub fn choose_action<T: ObservationValue>(&self, state: &[T]) -> Result<usize, AgentError> {
        let features = self.encoder.encode(state)?;
        let action = match self.exploration.choose() {
            Choice::Explore => self.actions.random_index(),
            Choice::Exploit => self.greedy_action(&features)?,
        };
        trace!("chose action {action}");
        Ok(action)
    }

    fn greedy_action(&self, features: &Features) -> Result<usize, AgentError> {
        let input: Tensor<B::InnerBackend, 2> = features.to_tensor(self.device);
        let output = self
            .online_net
            .valid()
            .forward(input)
            .argmax(1)
            .into_scalar();
        self.actions.check(output.elem::<i64>() as usize)
    }

    /// Store a transition in the replay memory, evicting the oldest one if the memory is full
    ///
    /// **Errors** if either state cannot be encoded or `action` is not an index into the action set
    pub fn add_in_memory<T: ObservationValue>(
        &mut self,
        state: &[T],
        action: usize,
        reward: f32,
        next_state: &[T],
    ) -> Result<(), AgentError> {
        let transition = Transition {
            state: self.encoder.encode(state)?,
            action: self.actions.check(action)?,
            reward,
            next_state: self.encoder.encode(next_state)?,
        };
        self.memory.push(transition);
        Ok(())
    }

    /// Perform one Double DQN learning step
    ///
    /// Draws a batch of distinct transitions and takes one optimizer step per transition, in
    /// sampling order. Each step regresses the online action values towards themselves, except
    /// at the taken action where the target is `reward + gamma * max(target_net(next_state))`.
    ///
    /// **Returns** the loss of the last step, or `None` if the memory holds fewer transitions
    /// than the batch size, in which case nothing changes
    pub fn learn(&mut self) -> Option<f32> {
        let batch = self.memory.sample()?;

        let mut loss = 0.0;
        for transition in batch {
            let state: Tensor<B, 2> = (&transition.state).to_tensor(self.device);
            let next_state: Tensor<B::InnerBackend, 2> =
                (&transition.next_state).to_tensor(self.device);

            let q_values = self.online_net.forward(state);
            let max_next_q = self
                .target_net
                .forward(next_state)
                .max()
                .into_scalar()
                .elem::<f32>();

            let mut targets = q_values.clone().into_data().convert::<f32>().value;
            if let Some(target) = targets.get_mut(transition.action) {
                *target = transition.reward + self.gamma * max_next_q;
            }
            let targets = Tensor::<B, 1>::from_floats(targets.as_slice(), self.device).unsqueeze();

            let step_loss = self.loss_fn.forward(q_values, targets, Reduction::Mean);
            let grads = GradientsParams::from_grads(step_loss.backward(), &self.online_net);
            self.online_net = self
                .optimizer
                .step(self.lr, self.online_net.clone(), grads);

            loss = step_loss.into_scalar().elem::<f32>();
        }

        debug!("learned from {} transitions, loss {loss}", self.memory.batch_size());
        self.loss = Some(loss);
        Some(loss)
    }

    /// Overwrite the target network with a snapshot of the online network
    pub fn update_target_network(&mut self) {
        self.target_net = self.online_net.valid();
        debug!("target network synchronized");
    }

    /// Deploy the agent into the environment for one episode
    ///
    /// Every step is stored in memory and followed by a call to [`learn`](DoubleDqnAgent::learn).
    /// The target network is left alone; sync it between episodes as needed.
    pub fn go<E: Environment>(&mut self, env: &mut E) -> Result<EpisodeReport, AgentError> {
        let mut report = EpisodeReport::default();
        let mut state = env.reset();

        loop {
            let action = self.choose_action(&state)?;
            let (next_state, reward, done) = env.step(action);
            self.add_in_memory(&state, action, reward, &next_state)?;

            if let Some(loss) = self.learn() {
                report.loss = Some(loss);
            }
            report.steps += 1;
            report.reward += reward;

            if done {
                break;
            }
            state = next_state;
        }

        Ok(report)
    }
}

impl<B, M, O, A> DoubleDqnAgent<B, M, O, A>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    pub fn online_net(&self) -> &M {
        &self.online_net
    }

    pub fn target_net(&self) -> &M::InnerModule {
        &self.target_net
    }

    pub fn actions(&self) -> &ActionSet<A> {
        &self.actions
    }

    pub fn memory(&self) -> &ReplayMemory {
        &self.memory
    }

    /// The loss of the most recent optimizer step, if any
    pub fn loss(&self) -> Option<f32> {
        self.loss
    }

    pub fn epsilon(&self) -> f32 {
        self.exploration.epsilon()
    }
}

#[cfg(test)]
mod tests {
    use burn::optim::AdamConfig;
    use statrs::distribution::{ChiSquared, ContinuousCDF};

    use crate::{
        env::tests::Corridor,
        model::{
            tests::{values, TestBackend, DEVICE},
            QNetwork, QNetworkConfig,
        },
    };

    use super::*;

    type B = TestBackend;
    type Agent<O> = DoubleDqnAgent<B, QNetwork<B>, O, usize>;

    const INPUT_SIZE: usize = 3;

    fn build(
        outputs: usize,
        num_actions: usize,
        config: &DoubleDqnConfig,
    ) -> Result<Agent<impl Optimizer<QNetwork<B>, B>>, AgentError> {
        let model = QNetworkConfig::new(config.input_size, outputs)
            .with_hidden_size(16)
            .init::<B>(&*DEVICE);
        DoubleDqnAgent::new(
            model,
            AdamConfig::new().init::<B, QNetwork<B>>(),
            ActionSet::indices(num_actions)?,
            config,
            &*DEVICE,
        )
    }

    fn agent(
        num_actions: usize,
        config: DoubleDqnConfig,
    ) -> Agent<impl Optimizer<QNetwork<B>, B>> {
        build(num_actions, num_actions, &config).unwrap()
    }

    fn reference_input() -> Tensor<<B as AutodiffBackend>::InnerBackend, 2> {
        Tensor::from_floats([[1.0, 2.0, 3.0]], &*DEVICE)
    }

    fn online_output<O>(agent: &Agent<O>) -> Vec<f32> {
        values(agent.online_net().valid().forward(reference_input()))
    }

    fn target_output<O>(agent: &Agent<O>) -> Vec<f32> {
        values(agent.target_net().forward(reference_input()))
    }

    fn fill<O: Optimizer<QNetwork<B>, B>>(agent: &mut Agent<O>, n: i32) {
        for i in 0..n {
            let action = (i % 4) as usize;
            agent
                .add_in_memory(&[i, i % 3, 1], action, 1.0, &[i + 1, (i + 1) % 3, 1])
                .unwrap();
        }
    }

    #[test]
    fn choose_action_returns_valid_index() {
        for epsilon in [0.0, 0.5, 1.0] {
            let agent = agent(4, DoubleDqnConfig::new(INPUT_SIZE).with_epsilon(epsilon));
            for i in 0..50 {
                let action = agent.choose_action(&[i, -i, 2 * i]).unwrap();
                assert!(agent.actions().get(action).is_some());
            }
        }
    }

    #[test]
    fn choose_action_rejects_malformed_state() {
        let agent = agent(4, DoubleDqnConfig::new(INPUT_SIZE));
        assert!(matches!(
            agent.choose_action(&[1.0, f64::NAN, 0.0]),
            Err(AgentError::Encode(_))
        ));
        assert!(matches!(
            agent.choose_action(&[1, 2]),
            Err(AgentError::Encode(_))
        ));
    }

    #[test]
    fn greedy_choice_is_deterministic() {
        let agent = agent(4, DoubleDqnConfig::new(INPUT_SIZE).with_epsilon(0.0));
        let first = agent.choose_action(&[3, 1, 4]).unwrap();
        for _ in 0..20 {
            assert_eq!(agent.choose_action(&[3, 1, 4]).unwrap(), first);
        }

        let q_values = values(agent.online_net().valid().forward(Tensor::from_floats(
            [[3.0, 1.0, 4.0]],
            &*DEVICE,
        )));
        let best = q_values
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(first, best, "greedy action maximizes the online values");
    }

    #[test]
    fn random_choice_is_uniform() {
        const TRIALS: usize = 4000;
        let agent = agent(4, DoubleDqnConfig::new(INPUT_SIZE).with_epsilon(1.0));

        let mut counts = [0usize; 4];
        for _ in 0..TRIALS {
            counts[agent.choose_action(&[0, 0, 0]).unwrap()] += 1;
        }

        let expected = TRIALS as f64 / 4.0;
        let statistic: f64 = counts
            .iter()
            .map(|&c| (c as f64 - expected).powi(2) / expected)
            .sum();
        let critical = ChiSquared::new(3.0).unwrap().inverse_cdf(0.999);
        assert!(
            statistic < critical,
            "counts {counts:?} are not uniform (chi2 = {statistic})"
        );
    }

    #[test]
    fn add_in_memory_validates_input() {
        let mut agent = agent(4, DoubleDqnConfig::new(INPUT_SIZE));
        assert!(matches!(
            agent.add_in_memory(&[0, 0, 0], 4, 1.0, &[0, 0, 1]),
            Err(AgentError::InvalidAction { index: 4, len: 4 })
        ));
        assert!(agent
            .add_in_memory(&[0, 0, 0], 0, 1.0, &[0, 0])
            .is_err());
        assert!(agent.memory().is_empty(), "rejected transitions are not stored");
    }

    #[test]
    fn memory_is_bounded() {
        let mut agent = agent(4, DoubleDqnConfig::new(INPUT_SIZE));
        fill(&mut agent, 1001);
        assert_eq!(agent.memory().len(), 1000);
        assert_eq!(
            agent.memory().iter().next().unwrap().state.as_slice(),
            [1.0, 1.0, 1.0],
            "oldest transition evicted"
        );
    }

    #[test]
    fn learn_waits_for_a_full_batch() {
        let mut agent = agent(4, DoubleDqnConfig::new(INPUT_SIZE));
        let before = online_output(&agent);

        fill(&mut agent, 31);
        assert_eq!(agent.learn(), None);
        assert_eq!(agent.loss(), None, "loss untouched");
        assert_eq!(online_output(&agent), before, "parameters untouched");

        fill(&mut agent, 1);
        assert!(agent.learn().is_some(), "active at exactly the batch size");
        assert!(agent.loss().is_some());
    }

    #[test]
    fn learn_trains_online_network_only() {
        let mut agent = agent(4, DoubleDqnConfig::new(INPUT_SIZE).with_gamma(0.9));
        fill(&mut agent, 40);

        let online_before = online_output(&agent);
        let target_before = target_output(&agent);

        let loss = agent.learn().unwrap();
        assert!(loss.is_finite() && loss >= 0.0, "loss {loss}");
        assert_eq!(agent.loss(), Some(loss));
        assert_ne!(online_output(&agent), online_before, "online parameters updated");
        assert_eq!(target_output(&agent), target_before, "target parameters frozen");
    }

    #[test]
    fn update_target_network_copies_online() {
        let mut agent = agent(4, DoubleDqnConfig::new(INPUT_SIZE));
        assert_eq!(target_output(&agent), online_output(&agent), "target starts as a copy");

        fill(&mut agent, 40);
        agent.learn();
        assert_ne!(target_output(&agent), online_output(&agent));

        agent.update_target_network();
        assert_eq!(target_output(&agent), online_output(&agent));
    }

    #[test]
    fn config_is_validated() {
        let result = build(2, 2, &DoubleDqnConfig::new(INPUT_SIZE).with_gamma(1.5));
        assert!(matches!(
            result,
            Err(AgentError::OutOfInterval { name: "gamma", .. })
        ));

        assert!(DoubleDqnConfig::new(INPUT_SIZE).with_lr(0.0).validate().is_err());
        assert!(DoubleDqnConfig::new(0).validate().is_err());
        assert!(DoubleDqnConfig::new(INPUT_SIZE)
            .with_epsilon(-0.1)
            .validate()
            .is_err());
        assert!(DoubleDqnConfig::new(INPUT_SIZE).validate().is_ok());
    }

    #[test]
    fn network_width_must_match_actions() {
        let config = DoubleDqnConfig::new(INPUT_SIZE);
        assert!(matches!(
            build(2, 4, &config),
            Err(AgentError::OutputWidth {
                expected: 4,
                found: 2
            })
        ));
        assert!(matches!(
            build(8, 2, &config),
            Err(AgentError::OutputWidth {
                expected: 2,
                found: 8
            })
        ));
        assert!(build(4, 4, &config).is_ok());
    }

    #[test]
    fn go_runs_one_episode() {
        let config = DoubleDqnConfig::new(1).with_batch_size(4).with_epsilon(0.5);
        let mut agent = agent(2, config);

        let mut env = Corridor::new(5, 20);
        let report = agent.go(&mut env).unwrap();

        assert!((4..=20).contains(&report.steps), "{} steps", report.steps);
        assert_eq!(agent.memory().len(), report.steps);
        assert!(report.loss.is_some(), "learned once the memory held a batch");
        assert_eq!(agent.loss(), report.loss);
    }
}
