use crate::operation::LeafOperation;
use crate::prelude::{Evaluate, FlowError, FlowResult, OperationConfig, Outcome};
use crate::processing::array_input;
use crate::value::{Value, ValueMap};
use ndarray::{ArrayD, Axis, IxDyn, Slice};

pub type LineLengthOperation = LeafOperation<LineLength>;

/// Absolute first difference along one axis, the classic line-length
/// feature.
#[derive(Debug, Clone, Default)]
pub struct LineLength {
    axis: usize,
    squared: bool,
}

impl LineLength {
    pub fn new(axis: usize, squared: bool) -> Self {
        Self { axis, squared }
    }

    pub fn operation(name: impl Into<String>, squared: bool) -> FlowResult<LineLengthOperation> {
        LeafOperation::new(name, Self::new(0, squared))
    }
}

impl Evaluate for LineLength {
    fn default_config(&self) -> OperationConfig {
        OperationConfig::new(["data"], ["line_length"])
    }

    fn evaluate(&mut self, inputs: ValueMap) -> FlowResult<Outcome> {
        let Some(data) = array_input(&inputs, "data")? else {
            return Ok(Outcome::One(Value::Empty));
        };
        if self.axis >= data.ndim() {
            return Err(FlowError::evaluation(format!(
                "line length axis {} out of range for {}-d data",
                self.axis,
                data.ndim()
            )));
        }

        let axis = Axis(self.axis);
        let mut diff = if data.len_of(axis) < 2 {
            let mut shape = data.shape().to_vec();
            shape[self.axis] = 0;
            ArrayD::zeros(IxDyn(&shape))
        } else {
            let upper = data.slice_axis(axis, Slice::from(1..));
            let lower = data.slice_axis(axis, Slice::from(..-1));
            (&upper - &lower).mapv(f64::abs)
        };
        if self.squared {
            diff.mapv_inplace(|v| v * v);
        }
        Ok(Outcome::One(Value::from(diff)))
    }
}
