use burn::{
    prelude::*,
    tensor::activation::{relu, softmax},
};
use nn::{Linear, LinearConfig};

/// A burn module mapping a batch of feature vectors to one value per action
///
/// Implement this for every [`Backend`], not only autodiff ones: the agents evaluate the
/// network on the inner backend whenever no gradient is needed.
pub trait QFunction<B: Backend>: Module<B> {
    /// `[batch, features]` → `[batch, actions]`
    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2>;
}

/// A burn module mapping a batch of feature vectors to a probability distribution over actions
///
/// Every output row must be non-negative and sum to one.
pub trait Policy<B: Backend>: Module<B> {
    /// `[batch, features]` → `[batch, actions]`
    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2>;
}

/// A fully connected Q network with two hidden ReLU layers
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    fc3: Linear<B>,
}

#[derive(Config, Debug)]
pub struct QNetworkConfig {
    input_size: usize,
    num_actions: usize,
    #[config(default = 64)]
    hidden_size: usize,
}

impl QNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> QNetwork<B> {
        QNetwork {
            fc1: LinearConfig::new(self.input_size, self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
            fc3: LinearConfig::new(self.hidden_size, self.num_actions).init(device),
        }
    }
}

impl<B: Backend> QFunction<B> for QNetwork<B> {
    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.fc1.forward(input));
        let x = relu(self.fc2.forward(x));
        self.fc3.forward(x)
    }
}

/// A fully connected policy network with two hidden ReLU layers and a softmax head
#[derive(Module, Debug)]
pub struct PolicyNetwork<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    fc3: Linear<B>,
}

#[derive(Config, Debug)]
pub struct PolicyNetworkConfig {
    input_size: usize,
    num_actions: usize,
    #[config(default = 64)]
    hidden_size: usize,
}

impl PolicyNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PolicyNetwork<B> {
        PolicyNetwork {
            fc1: LinearConfig::new(self.input_size, self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
            fc3: LinearConfig::new(self.hidden_size, self.num_actions).init(device),
        }
    }
}

impl<B: Backend> Policy<B> for PolicyNetwork<B> {
    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.fc1.forward(input));
        let x = relu(self.fc2.forward(x));
        softmax(self.fc3.forward(x), 1)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
    use once_cell::sync::Lazy;

    use super::*;

    pub(crate) type TestBackend = Autodiff<NdArray>;

    pub(crate) static DEVICE: Lazy<NdArrayDevice> = Lazy::new(NdArrayDevice::default);

    /// Flatten a tensor into a vector for comparisons
    pub(crate) fn values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
        tensor.into_data().convert::<f32>().value
    }

    #[test]
    fn q_network_shape() {
        let model = QNetworkConfig::new(3, 5).init::<TestBackend>(&*DEVICE);
        let input = Tensor::<TestBackend, 2>::zeros([2, 3], &*DEVICE);
        assert_eq!(QFunction::forward(&model, input).dims(), [2, 5]);
    }

    #[test]
    fn policy_network_outputs_distribution() {
        let model = PolicyNetworkConfig::new(3, 4)
            .with_hidden_size(8)
            .init::<TestBackend>(&*DEVICE);
        let input = Tensor::<TestBackend, 2>::from_floats([[1.0, -2.0, 3.0]], &*DEVICE);
        let probs = values(Policy::forward(&model, input));

        assert_eq!(probs.len(), 4);
        assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }
}
