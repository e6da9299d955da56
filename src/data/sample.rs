use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::element::Element;
use crate::math::vector::Vector;

/// One training or test example: an input vector and its class index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample<T, const N: usize> {
    pub input: Vector<T, N>,
    pub label: usize,
}

impl<T: Element, const N: usize> LabeledSample<T, N> {
    pub fn new(input: Vector<T, N>, label: usize) -> Self {
        LabeledSample { input, label }
    }

    /// Expected network output for this sample: `1` at `label`, `0` elsewhere.
    ///
    /// Fails with an out-of-range error when `label >= OUT`.
    pub fn one_hot<const OUT: usize>(&self) -> Result<Vector<T, OUT>> {
        let mut expected = Vector::zeros();
        *expected.get_mut(self.label)? = T::ONE;
        Ok(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn one_hot_sets_exactly_the_label() {
        let sample = LabeledSample::new(Vector::<f32, 2>::zeros(), 3);
        let expected = sample.one_hot::<5>().unwrap();
        assert_eq!(expected.as_slice(), &[0.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn one_hot_rejects_labels_past_the_output_layer() {
        let sample = LabeledSample::new(Vector::<f32, 2>::zeros(), 4);
        assert!(matches!(
            sample.one_hot::<4>(),
            Err(Error::IndexOutOfRange { index: 4, len: 4 })
        ));
    }
}
