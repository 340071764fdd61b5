//! Reference leaf collaborators.
//!
//! Each kernel implements [`Evaluate`](crate::prelude::Evaluate) and is run
//! by wrapping it in a [`LeafOperation`](crate::operation::LeafOperation).
//! Streaming leaves pass [`Value::Empty`] through so an exhausted source ends
//! a pipeline without raising.

pub mod array_streamer;
pub mod is_equal;
pub mod line_length;
pub mod running_mean;
pub mod spectrum;
pub mod sum;

pub use array_streamer::ArrayStreamer;
pub use is_equal::{Comparison, IsEqual, IsEqualOperation};
pub use line_length::{LineLength, LineLengthOperation};
pub use running_mean::RunningMean;
pub use spectrum::{Spectrum, SpectrumOperation};
pub use sum::{Sum, SumOperation};

use crate::prelude::{FlowError, FlowResult};
use crate::value::{Value, ValueMap};
use ndarray::ArrayD;
use std::rc::Rc;

/// Reads an array input. `Ok(None)` means the upstream signalled exhaustion.
pub(crate) fn array_input<'a>(
    inputs: &'a ValueMap,
    name: &str,
) -> FlowResult<Option<&'a Rc<ArrayD<f64>>>> {
    match inputs.require(name)? {
        Value::Empty => Ok(None),
        Value::Array(array) => Ok(Some(array)),
        other => Err(FlowError::evaluation(format!(
            "input '{}' must be an array, got {}",
            name,
            other.kind_name()
        ))),
    }
}

pub(crate) fn require_outputs(
    leaf: &str,
    config: &crate::prelude::OperationConfig,
    expected: usize,
) -> FlowResult<()> {
    if config.arity() != expected {
        return Err(FlowError::Configuration(format!(
            "{} declares {} outputs, expected {}",
            leaf,
            config.arity(),
            expected
        )));
    }
    Ok(())
}
