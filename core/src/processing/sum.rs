use crate::math::stats::StatsHelper;
use crate::operation::LeafOperation;
use crate::prelude::{Evaluate, FlowError, FlowResult, OperationConfig, Outcome};
use crate::processing::{array_input, require_outputs};
use crate::value::{Value, ValueMap};

pub type SumOperation = LeafOperation<Sum>;

/// Sum, minimum and maximum of an array, optionally scaled first.
#[derive(Debug, Default)]
pub struct Sum;

impl Sum {
    pub fn operation(name: impl Into<String>) -> FlowResult<SumOperation> {
        LeafOperation::new(name, Sum)
    }
}

impl Evaluate for Sum {
    fn default_config(&self) -> OperationConfig {
        OperationConfig::new(["data", "scale"], ["sum", "min", "max"]).with_optional(["scale"])
    }

    fn validate(&self, config: &OperationConfig) -> FlowResult<()> {
        require_outputs("sum", config, 3)
    }

    fn evaluate(&mut self, inputs: ValueMap) -> FlowResult<Outcome> {
        let scale = match inputs.get("scale") {
            None | Some(Value::Empty) => 1.0,
            Some(value) => value.as_float().ok_or_else(|| {
                FlowError::evaluation(format!("scale must be numeric, got {}", value.kind_name()))
            })?,
        };
        let data = array_input(&inputs, "data")?
            .ok_or_else(|| FlowError::evaluation("sum received no data"))?;

        let scaled: Vec<f64> = data.iter().map(|v| v * scale).collect();
        let (min, max) = match StatsHelper::extent(&scaled) {
            Some((lo, hi)) => (Value::from(lo), Value::from(hi)),
            None => (Value::Empty, Value::Empty),
        };
        let sum = Value::from(scaled.iter().sum::<f64>());
        Ok(Outcome::Many(vec![sum, min, max]))
    }
}
