use crate::operation::LeafOperation;
use crate::prelude::{Evaluate, FlowError, FlowResult, OperationConfig, Outcome};
use crate::value::{Value, ValueMap};
use serde::{Deserialize, Serialize};

pub type IsEqualOperation = LeafOperation<IsEqual>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Every element equals the first.
    #[default]
    All,
    /// No two elements are equal.
    Unique,
}

/// Compares the elements of a list or array.
#[derive(Debug, Default)]
pub struct IsEqual {
    comparison: Comparison,
}

impl IsEqual {
    pub fn new(comparison: Comparison) -> Self {
        Self { comparison }
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    pub fn operation(name: impl Into<String>, comparison: Comparison) -> FlowResult<IsEqualOperation> {
        LeafOperation::new(name, Self::new(comparison))
    }

    fn compare<T: PartialEq>(&self, items: &[T]) -> bool {
        match self.comparison {
            Comparison::All => items.windows(2).all(|pair| pair[0] == pair[1]),
            Comparison::Unique => items
                .iter()
                .enumerate()
                .all(|(i, item)| items[i + 1..].iter().all(|other| other != item)),
        }
    }
}

impl Evaluate for IsEqual {
    fn default_config(&self) -> OperationConfig {
        OperationConfig::new(["data"], ["result"])
    }

    fn evaluate(&mut self, inputs: ValueMap) -> FlowResult<Outcome> {
        let result = match inputs.require("data")? {
            Value::List(items) => self.compare(items),
            Value::Array(array) => {
                let items: Vec<f64> = array.iter().copied().collect();
                self.compare(&items)
            }
            other => {
                return Err(FlowError::evaluation(format!(
                    "is_equal expects a list or array, got {}",
                    other.kind_name()
                )))
            }
        };
        Ok(Outcome::One(Value::from(result)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use ndarray::array;

    fn run(comparison: Comparison, data: Value) -> Value {
        let mut op = IsEqual::operation("eq", comparison).unwrap();
        op.inputs().put_item("data", data).unwrap();
        op.execute().unwrap();
        op.outputs().get_item("result").unwrap()
    }

    #[test]
    fn all_compares_against_the_first_element() {
        let same = Value::from(vec![Value::from(2.5), Value::from(2.5)]);
        assert_eq!(run(Comparison::All, same), Value::from(true));
        assert_eq!(
            run(Comparison::All, Value::from(array![1.0, 1.0, 2.0])),
            Value::from(false)
        );
    }

    #[test]
    fn unique_rejects_repeats() {
        let distinct = Value::from(vec![Value::from(1), Value::from("a"), Value::Empty]);
        assert_eq!(run(Comparison::Unique, distinct), Value::from(true));
        assert_eq!(
            run(Comparison::Unique, Value::from(array![3.0, 1.0, 3.0])),
            Value::from(false)
        );
    }

    #[test]
    fn empty_collections_are_equal() {
        assert_eq!(run(Comparison::All, Value::from(Vec::new())), Value::from(true));
    }

    #[test]
    fn scalars_are_rejected() {
        let mut op = IsEqual::operation("eq", Comparison::All).unwrap();
        op.inputs().put_item("data", Value::from(1)).unwrap();
        assert!(matches!(op.execute(), Err(FlowError::Evaluation(_))));
    }
}
