use serde::{Deserialize, Serialize};

use crate::math::element::Element;

/// Element-wise activation functions.
///
/// `derivative()` takes the *activated* value `y = function(x)`, not the
/// pre-activation `x`. The trainer only keeps activated layer outputs, and
/// the sigmoid derivative is naturally written in terms of its own output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    Sigmoid,
    #[default]
    #[serde(rename = "relu")]
    ReLU,
    Tanh,
    Identity,
}

impl ActivationFunction {
    pub fn function<T: Element>(&self, x: T) -> T {
        match self {
            ActivationFunction::Sigmoid => T::ONE / (T::ONE + (-x).exp()),
            ActivationFunction::ReLU => if x >= T::ZERO { x } else { T::ZERO },
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::Identity => x,
        }
    }

    /// Derivative expressed through the activated output `y`.
    pub fn derivative<T: Element>(&self, y: T) -> T {
        match self {
            ActivationFunction::Sigmoid => (T::ONE - y) * y,
            ActivationFunction::ReLU => if y > T::ZERO { T::ONE } else { T::ZERO },
            ActivationFunction::Tanh => T::ONE - y * y,
            ActivationFunction::Identity => T::ONE,
        }
    }

    /// The `(activation, derivative)` closure pair the trainer expects.
    pub fn pair<T: Element>(self) -> (impl Fn(T) -> T + Sync, impl Fn(T) -> T + Sync) {
        (move |x| self.function(x), move |y| self.derivative(y))
    }
}
