use thiserror::Error;

/// Failure to turn an observation into a feature vector
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("Observation entry {index} is not representable as an integer")]
    NotInteger { index: usize },

    #[error("Observation has {found} entries, expected {expected}")]
    Length { expected: usize, found: usize },
}

/// A scalar observation entry that can be coerced to an integer
///
/// Floats are truncated toward zero, text is parsed as a base 10 integer.
/// Returns `None` when the value has no integer representation.
pub trait ObservationValue {
    fn to_integer(&self) -> Option<i64>;
}

macro_rules! impl_lossless {
    ($($t:ty),*) => {
        $(
            impl ObservationValue for $t {
                fn to_integer(&self) -> Option<i64> {
                    Some(i64::from(*self))
                }
            }
        )*
    };
}

macro_rules! impl_checked {
    ($($t:ty),*) => {
        $(
            impl ObservationValue for $t {
                fn to_integer(&self) -> Option<i64> {
                    i64::try_from(*self).ok()
                }
            }
        )*
    };
}

macro_rules! impl_float {
    ($($t:ty),*) => {
        $(
            impl ObservationValue for $t {
                fn to_integer(&self) -> Option<i64> {
                    let x = f64::from(*self).trunc();
                    // i64::MAX is not exactly representable, so the upper bound is exclusive
                    (x.is_finite() && x >= i64::MIN as f64 && x < i64::MAX as f64)
                        .then_some(x as i64)
                }
            }
        )*
    };
}

impl_lossless!(i8, i16, i32, i64, u8, u16, u32, bool);
impl_checked!(u64, usize, isize, i128, u128);
impl_float!(f32, f64);

impl ObservationValue for &str {
    fn to_integer(&self) -> Option<i64> {
        self.trim().parse().ok()
    }
}

impl ObservationValue for String {
    fn to_integer(&self) -> Option<i64> {
        self.as_str().to_integer()
    }
}

/// A fixed-length vector of features, ready to be fed to a network
#[derive(Debug, Clone, PartialEq)]
pub struct Features(Vec<f32>);

impl Features {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl From<Features> for Vec<f32> {
    fn from(features: Features) -> Self {
        features.0
    }
}

/// Converts raw observations into [`Features`] of a fixed length
///
/// Each entry is truncated to an integer and then stored as a float, so `[1.7, -2.3, 4]`
/// becomes `[1.0, -2.0, 4.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateEncoder {
    input_size: usize,
}

impl StateEncoder {
    pub fn new(input_size: usize) -> Self {
        Self { input_size }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Encode an observation
    ///
    /// ### Errors
    /// - [`EncodeError::Length`] if the observation does not have exactly `input_size` entries
    /// - [`EncodeError::NotInteger`] for the first entry with no integer representation
    pub fn encode<T: ObservationValue>(&self, observation: &[T]) -> Result<Features, EncodeError> {
        if observation.len() != self.input_size {
            return Err(EncodeError::Length {
                expected: self.input_size,
                found: observation.len(),
            });
        }

        observation
            .iter()
            .enumerate()
            .map(|(index, value)| {
                value
                    .to_integer()
                    .map(|x| x as f32)
                    .ok_or(EncodeError::NotInteger { index })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Features)
    }
}
