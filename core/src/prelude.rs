use crate::value::{Value, ValueMap};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Port declaration for an operation.
///
/// Every operation owns its own copy; leaves hand out a fresh one from
/// [`Evaluate::default_config`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationConfig {
    pub input_names: Vec<String>,
    pub output_names: Vec<String>,
    /// Inputs that read as [`Value::Empty`] instead of failing when nothing
    /// was put into them.
    pub optional_inputs: Vec<String>,
}

impl OperationConfig {
    pub fn new<I, O>(input_names: I, output_names: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            input_names: input_names.into_iter().map(Into::into).collect(),
            output_names: output_names.into_iter().map(Into::into).collect(),
            optional_inputs: Vec::new(),
        }
    }

    pub fn with_optional<N>(mut self, names: N) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
    {
        self.optional_inputs = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn arity(&self) -> usize {
        self.output_names.len()
    }

    pub fn is_optional(&self, name: &str) -> bool {
        self.optional_inputs.iter().any(|n| n == name)
    }

    /// Rejects empty or duplicated names and optional inputs that are not
    /// declared inputs.
    pub fn validate(&self) -> FlowResult<()> {
        check_names("input", &self.input_names)?;
        check_names("output", &self.output_names)?;
        if let Some(stray) = self
            .optional_inputs
            .iter()
            .find(|name| !self.input_names.contains(name))
        {
            return Err(FlowError::Configuration(format!(
                "optional input '{}' is not a declared input",
                stray
            )));
        }
        Ok(())
    }
}

fn check_names(direction: &str, names: &[String]) -> FlowResult<()> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if name.is_empty() {
            return Err(FlowError::Configuration(format!(
                "{} port names must not be empty",
                direction
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(FlowError::Configuration(format!(
                "duplicate {} port '{}'",
                direction, name
            )));
        }
    }
    Ok(())
}

/// Shape of the value returned by `evaluate`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Nothing,
    One(Value),
    /// Positional values, one per declared output name.
    Many(Vec<Value>),
    /// Named values pushed straight into the outputs.
    Mapping(ValueMap),
}

impl Outcome {
    pub fn shape_name(&self) -> &'static str {
        match self {
            Outcome::Nothing => "nothing",
            Outcome::One(_) => "a single value",
            Outcome::Many(_) => "a tuple",
            Outcome::Mapping(_) => "a mapping",
        }
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Outcome::One(value)
    }
}

/// Errors raised by ports and operations.
///
/// The engine never translates an error it receives; whatever a leaf returns
/// reaches the caller as is.
#[derive(thiserror::Error, Debug)]
pub enum FlowError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("port '{port}' is empty")]
    PortEmpty { port: String },
    #[error("delegator '{port}' is not bound to a target")]
    PortUnbound { port: String },
    #[error(transparent)]
    Evaluation(Box<dyn std::error::Error + Send + Sync>),
}

impl FlowError {
    pub fn evaluation<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        FlowError::Evaluation(error.into())
    }
}

pub type FlowResult<T> = Result<T, FlowError>;

/// Contract a leaf collaborator implements to become an operation.
///
/// `evaluate` sees only the named inputs. Stateful leaves keep whatever they
/// need in their own fields.
pub trait Evaluate {
    fn default_config(&self) -> OperationConfig;

    /// Hook for leaves that only accept particular port layouts.
    fn validate(&self, _config: &OperationConfig) -> FlowResult<()> {
        Ok(())
    }

    fn evaluate(&mut self, inputs: ValueMap) -> FlowResult<Outcome>;
}

impl ValueMap {
    /// Looks up a named input, failing when the caller did not supply it.
    pub fn require(&self, name: &str) -> FlowResult<&Value> {
        self.get(name).ok_or_else(|| {
            FlowError::Configuration(format!("missing input '{}'", name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_output_names_are_rejected() {
        let config = OperationConfig::new(["x"], ["out", "out"]);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, FlowError::Configuration(_)));
        assert!(err.to_string().contains("duplicate output port 'out'"));
    }

    #[test]
    fn optional_inputs_must_be_declared() {
        let config = OperationConfig::new(["data"], ["sum"]).with_optional(["scale"]);
        assert!(config.validate().is_err());

        let config = OperationConfig::new(["data", "scale"], ["sum"]).with_optional(["scale"]);
        assert!(config.validate().is_ok());
        assert!(config.is_optional("scale"));
    }

    #[test]
    fn evaluation_errors_display_their_source() {
        let err = FlowError::evaluation("sensor offline");
        assert_eq!(err.to_string(), "sensor offline");
    }
}
