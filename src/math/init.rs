use rand::distributions::Uniform;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::element::Element;

/// How `Matrix::randomize` draws from `[-1/√n, 1/√n]`.
///
/// - `Continuous` — a plain uniform distribution over the closed range.
/// - `Quantized`  — the range is cut into `⌊width · scale⌋` buckets and a
///   bucket is drawn uniformly; the value is `low + k / scale`. This
///   reproduces trainers that sample integers and rescale them, upper
///   bound excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum InitSampling {
    #[default]
    Continuous,
    Quantized { scale: u32 },
}

/// Fan-in scaled bounds `(-1/√n, 1/√n)`.
pub(crate) fn fan_in_bounds(fan_in: usize) -> Result<(f64, f64)> {
    if fan_in == 0 {
        return Err(Error::InvalidHyperparameter {
            name: "fan_in",
            reason: "must be at least 1".into(),
        });
    }
    let bound = 1.0 / (fan_in as f64).sqrt();
    Ok((-bound, bound))
}

/// A prepared draw for one `randomize` call.
pub(crate) enum Sampler<T: Element> {
    Continuous(Uniform<T>),
    Quantized { low: f64, scale: f64, buckets: u64 },
}

impl<T: Element> Sampler<T> {
    pub(crate) fn new(low: f64, high: f64, sampling: InitSampling) -> Result<Self> {
        match sampling {
            InitSampling::Continuous => Ok(Sampler::Continuous(Uniform::new_inclusive(
                T::from_f64(low),
                T::from_f64(high),
            ))),
            InitSampling::Quantized { scale } => {
                let buckets = ((high - low) * scale as f64) as u64;
                if buckets == 0 {
                    return Err(Error::InvalidHyperparameter {
                        name: "scale",
                        reason: format!("{scale} leaves no buckets in [{low}, {high}]"),
                    });
                }
                Ok(Sampler::Quantized {
                    low,
                    scale: scale as f64,
                    buckets,
                })
            }
        }
    }

    pub(crate) fn sample<G: Rng + ?Sized>(&self, rng: &mut G) -> T {
        match self {
            Sampler::Continuous(dist) => rng.sample(dist),
            Sampler::Quantized { low, scale, buckets } => {
                let k = rng.gen_range(0..*buckets);
                T::from_f64(low + k as f64 / scale)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn bounds_shrink_with_fan_in() {
        let (low, high) = fan_in_bounds(100).unwrap();
        assert!((low + 0.1).abs() < 1e-12);
        assert!((high - 0.1).abs() < 1e-12);
        assert!(fan_in_bounds(0).is_err());
    }

    #[test]
    fn quantized_values_sit_on_the_grid() {
        let mut rng = StdRng::seed_from_u64(7);
        let sampler = Sampler::<f64>::new(-0.5, 0.5, InitSampling::Quantized { scale: 10 }).unwrap();
        for _ in 0..200 {
            let x = sampler.sample(&mut rng);
            assert!((-0.5..0.5).contains(&x));
            let k = (x + 0.5) * 10.0;
            assert!((k - k.round()).abs() < 1e-9);
        }
    }

    #[test]
    fn quantized_needs_at_least_one_bucket() {
        let sampler = Sampler::<f32>::new(-0.01, 0.01, InitSampling::Quantized { scale: 10 });
        assert!(sampler.is_err());
    }
}
