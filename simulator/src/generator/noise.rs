use crate::generator::profile::jitter;
use ndarray::Array2;
use rand::{rngs::StdRng, SeedableRng};
use sigflow::operation::LeafOperation;
use sigflow::{Evaluate, FlowError, FlowResult, OperationConfig, Outcome, Value, ValueMap};

/// Source leaf producing a fresh block of seeded uniform noise per call.
pub struct NoiseSource {
    rng: StdRng,
    shape: (usize, usize),
    amplitude: f64,
}

impl NoiseSource {
    pub fn new(shape: (usize, usize), amplitude: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            shape,
            amplitude,
        }
    }

    pub fn operation(
        name: &str,
        shape: (usize, usize),
        amplitude: f64,
        seed: u64,
    ) -> FlowResult<LeafOperation<Self>> {
        if !amplitude.is_finite() {
            return Err(FlowError::Configuration(format!(
                "noise source '{}' needs a finite amplitude, got {}",
                name, amplitude
            )));
        }
        LeafOperation::new(name, Self::new(shape, amplitude, seed))
    }
}

impl Evaluate for NoiseSource {
    fn default_config(&self) -> OperationConfig {
        OperationConfig::new(Vec::<String>::new(), ["data"])
    }

    fn evaluate(&mut self, _inputs: ValueMap) -> FlowResult<Outcome> {
        let amplitude = self.amplitude;
        let rng = &mut self.rng;
        let block = Array2::from_shape_fn(self.shape, |_| jitter(rng, amplitude));
        Ok(Outcome::One(Value::from(block)))
    }
}
