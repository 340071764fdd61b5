use crate::math::stats::RunningStats;
use crate::operation::LeafOperation;
use crate::prelude::{Evaluate, FlowError, FlowResult, OperationConfig, Outcome};
use crate::value::{Value, ValueMap};

/// Mean of everything seen so far. State lives in the kernel, so each
/// operation instance keeps its own running total.
#[derive(Debug, Default)]
pub struct RunningMean {
    stats: RunningStats,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation(name: impl Into<String>) -> FlowResult<LeafOperation<Self>> {
        LeafOperation::new(name, Self::new())
    }

    pub fn mean(&self) -> Option<f64> {
        self.stats.mean()
    }

    pub fn count(&self) -> u64 {
        self.stats.count()
    }

    pub fn reset(&mut self) {
        self.stats = RunningStats::new();
    }
}

impl Evaluate for RunningMean {
    fn default_config(&self) -> OperationConfig {
        OperationConfig::new(["data"], ["mean"])
    }

    fn evaluate(&mut self, inputs: ValueMap) -> FlowResult<Outcome> {
        match inputs.require("data")? {
            Value::Empty => return Ok(Outcome::One(Value::Empty)),
            Value::Array(array) => array.iter().for_each(|&v| self.stats.push(v)),
            Value::List(items) => {
                for item in items {
                    let v = item.as_float().ok_or_else(|| {
                        FlowError::evaluation(format!("cannot average {}", item.kind_name()))
                    })?;
                    self.stats.push(v);
                }
            }
            other => match other.as_float() {
                Some(v) => self.stats.push(v),
                None => {
                    return Err(FlowError::evaluation(format!(
                        "cannot average {}",
                        other.kind_name()
                    )))
                }
            },
        }
        let mean = self.stats.mean().map(Value::from).unwrap_or_default();
        Ok(Outcome::One(mean))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn feed(kernel: &mut RunningMean, data: Value) -> Outcome {
        kernel
            .evaluate([("data", data)].into_iter().collect())
            .unwrap()
    }

    #[test]
    fn mean_accumulates_across_calls() {
        let mut kernel = RunningMean::new();
        feed(&mut kernel, Value::from(array![1.0, 3.0]));
        let out = feed(&mut kernel, Value::from(5));
        assert_eq!(out, Outcome::One(Value::from(3.0)));
        assert_eq!(kernel.count(), 3);
    }

    #[test]
    fn instances_do_not_share_state() {
        let mut first = RunningMean::new();
        let second = RunningMean::new();
        feed(&mut first, Value::from(2.0));
        assert_eq!(first.mean(), Some(2.0));
        assert_eq!(second.mean(), None);
    }

    #[test]
    fn exhausted_input_keeps_the_total() {
        let mut kernel = RunningMean::new();
        feed(&mut kernel, Value::from(4.0));
        assert_eq!(feed(&mut kernel, Value::Empty), Outcome::One(Value::Empty));
        assert_eq!(kernel.mean(), Some(4.0));
    }
}
