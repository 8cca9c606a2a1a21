use burn::{prelude::*, tensor::BasicOps};

use crate::encoder::Features;

/// A trait for converting items to tensors
///
/// Implemented for [`Features`] to produce a batch of one, which is the input shape every
/// network in this crate expects
pub trait ToTensor<B: Backend, const D: usize, K: BasicOps<B>> {
    fn to_tensor(self, device: &B::Device) -> Tensor<B, D, K>;
}

impl<B: Backend> ToTensor<B, 2, Float> for &Features {
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 2> {
        Tensor::<B, 1>::from_floats(self.as_slice(), device).unsqueeze()
    }
}
