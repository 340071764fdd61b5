use crate::operation::LeafOperation;
use crate::prelude::{Evaluate, FlowError, FlowResult, OperationConfig, Outcome};
use crate::value::{Value, ValueMap};
use ndarray::{ArrayD, Axis, Slice};

/// Source leaf that hands out successive row chunks of an array.
///
/// Once every row has been emitted it returns [`Value::Empty`] on each call
/// until [`ArrayStreamer::rewind`] is called.
#[derive(Debug)]
pub struct ArrayStreamer {
    array: ArrayD<f64>,
    chunk_rows: usize,
    cursor: usize,
}

impl ArrayStreamer {
    pub fn new(array: ArrayD<f64>, chunk_rows: usize) -> FlowResult<Self> {
        if chunk_rows == 0 {
            return Err(FlowError::Configuration(
                "array streamer chunk size must be positive".into(),
            ));
        }
        if array.ndim() == 0 {
            return Err(FlowError::Configuration(
                "array streamer needs at least one axis".into(),
            ));
        }
        Ok(Self {
            array,
            chunk_rows,
            cursor: 0,
        })
    }

    pub fn operation(
        name: impl Into<String>,
        array: ArrayD<f64>,
        chunk_rows: usize,
    ) -> FlowResult<LeafOperation<Self>> {
        LeafOperation::new(name, Self::new(array, chunk_rows)?)
    }

    pub fn rows(&self) -> usize {
        self.array.len_of(Axis(0))
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.rows()
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Next chunk, or `None` once exhausted.
    pub fn next_chunk(&mut self) -> Option<ArrayD<f64>> {
        if self.is_exhausted() {
            return None;
        }
        let end = (self.cursor + self.chunk_rows).min(self.rows());
        let chunk = self
            .array
            .slice_axis(Axis(0), Slice::from(self.cursor..end))
            .to_owned();
        self.cursor = end;
        Some(chunk)
    }
}

impl Evaluate for ArrayStreamer {
    fn default_config(&self) -> OperationConfig {
        OperationConfig::new(Vec::<String>::new(), ["data"])
    }

    fn evaluate(&mut self, _inputs: ValueMap) -> FlowResult<Outcome> {
        let value = self.next_chunk().map(Value::from).unwrap_or_default();
        Ok(Outcome::One(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use ndarray::Array2;

    #[test]
    fn streams_chunks_then_signals_exhaustion() {
        let array = Array2::from_shape_fn((5, 2), |(r, c)| (r * 2 + c) as f64).into_dyn();
        let mut op = ArrayStreamer::operation("stream", array, 2).unwrap();

        let mut shapes = Vec::new();
        loop {
            op.execute().unwrap();
            let chunk = op.outputs().get_item("data").unwrap();
            match chunk.as_array() {
                Some(array) => shapes.push(array.shape().to_vec()),
                None => {
                    assert!(chunk.is_empty());
                    break;
                }
            }
        }
        assert_eq!(shapes, vec![vec![2, 2], vec![2, 2], vec![1, 2]]);

        op.execute().unwrap();
        assert_eq!(op.outputs().get_item("data").unwrap(), Value::Empty);

        op.kernel_mut().rewind();
        assert!(!op.kernel().is_exhausted());
    }

    #[test]
    fn zero_chunk_is_rejected() {
        let array = Array2::<f64>::zeros((2, 2)).into_dyn();
        assert!(ArrayStreamer::new(array, 0).is_err());
    }
}
