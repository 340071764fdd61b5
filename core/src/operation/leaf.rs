use crate::operation::base::{Operation, OperationIo, PortStyle};
use crate::prelude::{Evaluate, FlowResult, OperationConfig, Outcome};
use crate::telemetry::LogManager;
use crate::value::ValueMap;

/// Operation whose computation is supplied by an [`Evaluate`] collaborator.
pub struct LeafOperation<E> {
    io: OperationIo,
    kernel: E,
    logger: LogManager,
}

impl<E: Evaluate> LeafOperation<E> {
    /// Builds the operation with the ports the kernel declares by default.
    pub fn new(name: impl Into<String>, kernel: E) -> FlowResult<Self> {
        let config = kernel.default_config();
        Self::with_config(name, config, kernel)
    }

    pub fn with_config(
        name: impl Into<String>,
        config: OperationConfig,
        kernel: E,
    ) -> FlowResult<Self> {
        kernel.validate(&config)?;
        let mut io = OperationIo::declare(name, config, PortStyle::Containers)?;
        io.mark_ready();
        Ok(Self {
            io,
            kernel,
            logger: LogManager::new(),
        })
    }

    pub fn kernel(&self) -> &E {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut E {
        &mut self.kernel
    }
}

impl<E: Evaluate + 'static> LeafOperation<E> {
    pub fn boxed(self) -> Box<dyn Operation> {
        Box::new(self)
    }
}

impl<E: Evaluate> Operation for LeafOperation<E> {
    fn io(&self) -> &OperationIo {
        &self.io
    }

    fn io_mut(&mut self) -> &mut OperationIo {
        &mut self.io
    }

    fn evaluate(&mut self, inputs: ValueMap) -> FlowResult<Outcome> {
        self.kernel.evaluate(inputs)
    }

    fn execute(&mut self) -> FlowResult<()> {
        let inputs = self.io.gather_inputs()?;
        let outcome = self.kernel.evaluate(inputs)?;
        self.io.push(outcome)?;
        self.logger
            .executed(self.io.name(), self.io.strategy().name());
        Ok(())
    }
}

/// Adapts a closure into a leaf kernel.
pub struct FnKernel<F> {
    config: OperationConfig,
    body: F,
}

impl<F> FnKernel<F>
where
    F: FnMut(ValueMap) -> FlowResult<Outcome>,
{
    pub fn new(config: OperationConfig, body: F) -> Self {
        Self { config, body }
    }
}

impl<F> Evaluate for FnKernel<F>
where
    F: FnMut(ValueMap) -> FlowResult<Outcome>,
{
    fn default_config(&self) -> OperationConfig {
        self.config.clone()
    }

    fn evaluate(&mut self, inputs: ValueMap) -> FlowResult<Outcome> {
        (self.body)(inputs)
    }
}

impl<F> LeafOperation<FnKernel<F>>
where
    F: FnMut(ValueMap) -> FlowResult<Outcome>,
{
    pub fn from_fn(name: impl Into<String>, config: OperationConfig, body: F) -> FlowResult<Self> {
        Self::new(name, FnKernel::new(config, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::base::{DispatchStrategy, OperationState};
    use crate::prelude::FlowError;
    use crate::value::Value;

    struct Scale {
        factor: f64,
        calls: usize,
    }

    impl Evaluate for Scale {
        fn default_config(&self) -> OperationConfig {
            OperationConfig::new(["x"], ["scaled"])
        }

        fn validate(&self, config: &OperationConfig) -> FlowResult<()> {
            if config.arity() != 1 {
                return Err(FlowError::Configuration("scale has one output".into()));
            }
            Ok(())
        }

        fn evaluate(&mut self, inputs: ValueMap) -> FlowResult<Outcome> {
            self.calls += 1;
            let x = inputs.require("x")?.as_float().unwrap_or_default();
            Ok(Outcome::One(Value::from(x * self.factor)))
        }
    }

    #[test]
    fn execute_moves_values_between_ports() {
        let mut op = LeafOperation::new("scale", Scale { factor: 2.0, calls: 0 }).unwrap();
        assert_eq!(op.state(), OperationState::Ready);

        op.inputs().put_item("x", Value::from(4.0)).unwrap();
        op.execute().unwrap();
        assert_eq!(op.outputs().get_item("scaled").unwrap(), Value::from(8.0));
        assert_eq!(op.kernel().calls, 1);
    }

    #[test]
    fn evaluate_bypasses_ports() {
        let mut op = LeafOperation::new("scale", Scale { factor: 3.0, calls: 0 }).unwrap();
        let inputs: ValueMap = [("x", Value::from(2.0))].into_iter().collect();
        assert_eq!(op.evaluate(inputs).unwrap(), Outcome::One(Value::from(6.0)));
        assert!(op.outputs().get_item("scaled").is_err());
    }

    #[test]
    fn kernel_validation_runs_at_construction() {
        let config = OperationConfig::new(["x"], ["a", "b"]);
        let result = LeafOperation::with_config("scale", config, Scale { factor: 1.0, calls: 0 });
        assert!(matches!(result, Err(FlowError::Configuration(_))));
    }

    #[test]
    fn empty_input_fails_execute() {
        let mut op = LeafOperation::new("scale", Scale { factor: 1.0, calls: 0 }).unwrap();
        let err = op.execute().unwrap_err();
        assert!(matches!(err, FlowError::PortEmpty { ref port } if port == "scale.x"));
        assert_eq!(op.kernel().calls, 0);
    }

    #[test]
    fn failed_execute_keeps_inputs_already_supplied() {
        let config = OperationConfig::new(["a", "b"], ["total"]);
        let mut op = LeafOperation::from_fn("add", config, |inputs| {
            let a = inputs.require("a")?.as_float().unwrap_or_default();
            let b = inputs.require("b")?.as_float().unwrap_or_default();
            Ok(Outcome::One(Value::from(a + b)))
        })
        .unwrap();

        op.inputs().put_item("a", Value::from(2.0)).unwrap();
        let err = op.execute().unwrap_err();
        assert!(matches!(err, FlowError::PortEmpty { ref port } if port == "add.b"));

        op.inputs().put_item("b", Value::from(3.0)).unwrap();
        op.execute().unwrap();
        assert_eq!(op.outputs().get_item("total").unwrap(), Value::from(5.0));
    }

    #[test]
    fn mapping_dispatch_forwards_named_values() {
        let config = OperationConfig::new(Vec::<String>::new(), ["low", "high"]);
        let mut op = LeafOperation::from_fn("split", config, |_| {
            let values: ValueMap = [("high", Value::from(9)), ("low", Value::from(1))]
                .into_iter()
                .collect();
            Ok(Outcome::Mapping(values))
        })
        .unwrap();
        op.io_mut().select_strategy(DispatchStrategy::Mapping).unwrap();

        op.execute().unwrap();
        assert_eq!(op.outputs().get_item("low").unwrap(), Value::from(1));
        assert_eq!(op.outputs().get_item("high").unwrap(), Value::from(9));
    }

    #[test]
    fn optional_inputs_read_as_empty() {
        let config = OperationConfig::new(["data", "scale"], ["out"]).with_optional(["scale"]);
        let mut op = LeafOperation::from_fn("opt", config, |inputs| {
            let scale = inputs.require("scale")?.as_float().unwrap_or(1.0);
            let data = inputs.require("data")?.as_float().unwrap_or_default();
            Ok(Outcome::One(Value::from(data * scale)))
        })
        .unwrap();

        op.inputs().put_item("data", Value::from(5.0)).unwrap();
        op.execute().unwrap();
        assert_eq!(op.outputs().get_item("out").unwrap(), Value::from(5.0));
    }
}
