use crate::math::fft::FftHelper;
use crate::math::stats::StatsHelper;
use crate::operation::LeafOperation;
use crate::prelude::{Evaluate, FlowResult, OperationConfig, Outcome};
use crate::processing::array_input;
use crate::telemetry::log::LogManager;
use crate::value::{Value, ValueMap};
use ndarray::Array1;

pub type SpectrumOperation = LeafOperation<Spectrum>;

/// FFT magnitude spectrum of the flattened input.
///
/// With no fixed size the transform length follows the input; the planner is
/// rebuilt only when that length changes.
pub struct Spectrum {
    size: Option<usize>,
    fft: Option<FftHelper>,
    logger: LogManager,
}

impl Spectrum {
    pub fn new(size: Option<usize>) -> Self {
        Self {
            size,
            fft: None,
            logger: LogManager::new(),
        }
    }

    pub fn operation(name: impl Into<String>, size: Option<usize>) -> FlowResult<SpectrumOperation> {
        LeafOperation::new(name, Self::new(size))
    }

    fn helper(&mut self, len: usize) -> &FftHelper {
        let size = self.size.unwrap_or(len).max(1);
        if self.fft.as_ref().map(FftHelper::size) != Some(size) {
            self.fft = None;
        }
        self.fft.get_or_insert_with(|| FftHelper::new(size))
    }
}

impl Evaluate for Spectrum {
    fn default_config(&self) -> OperationConfig {
        OperationConfig::new(["data"], ["magnitudes"])
    }

    fn evaluate(&mut self, inputs: ValueMap) -> FlowResult<Outcome> {
        let Some(data) = array_input(&inputs, "data")? else {
            return Ok(Outcome::One(Value::Empty));
        };
        let samples: Vec<f64> = data.iter().copied().collect();
        let magnitudes = self.helper(samples.len()).magnitudes(&samples);

        let rms = StatsHelper::rms(&magnitudes);
        self.logger.record(&format!("Spectrum RMS {:.4}", rms));
        Ok(Outcome::One(Value::from(Array1::from(magnitudes))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use ndarray::array;

    #[test]
    fn spectrum_returns_magnitude_sequence() {
        let mut op = Spectrum::operation("spectrum", Some(8)).unwrap();
        op.inputs()
            .put_item("data", Value::from(array![1.0, 0.0, 0.0, 0.0]))
            .unwrap();
        op.execute().unwrap();

        let out = op.outputs().get_item("magnitudes").unwrap();
        let magnitudes = out.as_array().unwrap();
        assert_eq!(magnitudes.len(), 8);
        assert!(magnitudes.iter().all(|m| (m - 1.0).abs() < 1e-12));
    }

    #[test]
    fn planner_follows_input_length() {
        let mut kernel = Spectrum::new(None);
        for len in [4usize, 6] {
            let inputs: ValueMap = [("data", Value::from(Array1::<f64>::zeros(len)))]
                .into_iter()
                .collect();
            kernel.evaluate(inputs).unwrap();
            assert_eq!(kernel.fft.as_ref().map(FftHelper::size), Some(len));
        }
    }
}
