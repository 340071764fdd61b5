use crate::io::{Container, Delegator, Manager, PortMap, PortRef};
use crate::prelude::{FlowError, FlowResult, OperationConfig, Outcome};
use crate::value::{Value, ValueMap};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// How `execute` forwards the result of `evaluate` into the outputs.
///
/// Chosen once when the output names are set, then dispatched through a
/// stored function pointer on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStrategy {
    /// No outputs; the result is discarded.
    None,
    /// One output; the single value is keyed by the sole output name.
    One,
    /// Several outputs; a positional tuple is zipped with the output names.
    Many,
    /// Named values are pushed as returned. Never derived from arity.
    Mapping,
}

type PushFn = fn(&OperationIo, Outcome) -> FlowResult<()>;

impl DispatchStrategy {
    pub fn from_arity(arity: usize) -> Self {
        match arity {
            0 => DispatchStrategy::None,
            1 => DispatchStrategy::One,
            _ => DispatchStrategy::Many,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DispatchStrategy::None => "none",
            DispatchStrategy::One => "one",
            DispatchStrategy::Many => "many",
            DispatchStrategy::Mapping => "mapping",
        }
    }

    fn push_fn(self) -> PushFn {
        match self {
            DispatchStrategy::None => push_nothing,
            DispatchStrategy::One => push_one,
            DispatchStrategy::Many => push_many,
            DispatchStrategy::Mapping => push_mapping,
        }
    }
}

fn push_nothing(_io: &OperationIo, _outcome: Outcome) -> FlowResult<()> {
    Ok(())
}

fn push_one(io: &OperationIo, outcome: Outcome) -> FlowResult<()> {
    match outcome {
        Outcome::One(value) => {
            let mut named = ValueMap::with_capacity(1);
            named.insert(io.config.output_names[0].clone(), value);
            io.outputs.put_all(named)
        }
        other => Err(io.shape_error(&other)),
    }
}

fn push_many(io: &OperationIo, outcome: Outcome) -> FlowResult<()> {
    match outcome {
        Outcome::Many(values) if values.len() == io.config.arity() => {
            io.outputs.put_all(io.output_as_map(values))
        }
        other => Err(io.shape_error(&other)),
    }
}

fn push_mapping(io: &OperationIo, outcome: Outcome) -> FlowResult<()> {
    match outcome {
        Outcome::Mapping(values) => io.outputs.put_all(values),
        other => Err(io.shape_error(&other)),
    }
}

/// Lifecycle of an operation's port wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Unconfigured,
    PortsDeclared,
    Ready,
}

/// Which ports an operation declares for its names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PortStyle {
    /// Leaves own their slots.
    Containers,
    /// Groups forward to ports of their children.
    Delegators,
}

/// Named port sets plus the dispatch strategy of one operation.
///
/// Shared by leaves and groups so both expose the same external interface.
#[derive(Debug)]
pub struct OperationIo {
    name: String,
    config: OperationConfig,
    inputs: Rc<Manager>,
    outputs: Rc<Manager>,
    strategy: DispatchStrategy,
    pinned: bool,
    push: PushFn,
    state: OperationState,
    style: PortStyle,
}

impl OperationIo {
    pub(crate) fn declare(
        name: impl Into<String>,
        config: OperationConfig,
        style: PortStyle,
    ) -> FlowResult<Self> {
        let mut io = Self::unconfigured(name, style)?;
        io.configure(config)?;
        Ok(io)
    }

    /// Empty port sets, waiting for [`OperationIo::configure`].
    pub(crate) fn unconfigured(name: impl Into<String>, style: PortStyle) -> FlowResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(FlowError::Configuration(
                "operation names must not be empty".into(),
            ));
        }

        let strategy = DispatchStrategy::None;
        Ok(Self {
            inputs: Rc::new(Manager::new(format!("{}.inputs", name))),
            outputs: Rc::new(Manager::new(format!("{}.outputs", name))),
            name,
            config: OperationConfig::default(),
            strategy,
            pinned: false,
            push: strategy.push_fn(),
            state: OperationState::Unconfigured,
            style,
        })
    }

    /// Validates `config` and declares one port per name. Only allowed once.
    pub(crate) fn configure(&mut self, config: OperationConfig) -> FlowResult<()> {
        if self.state != OperationState::Unconfigured {
            return Err(FlowError::Configuration(format!(
                "operation '{}' is already configured",
                self.name
            )));
        }
        config.validate()?;

        if !self.pinned {
            self.apply_strategy(DispatchStrategy::from_arity(config.arity()));
        }
        self.config = config;
        let input_names = self.config.input_names.clone();
        let output_names = self.config.output_names.clone();
        self.declare_inputs(&input_names);
        self.declare_outputs(&output_names);
        self.state = OperationState::PortsDeclared;
        Ok(())
    }

    fn new_port(&self, port: &str, optional: bool) -> PortRef {
        let label = format!("{}.{}", self.name, port);
        match (self.style, optional) {
            (PortStyle::Delegators, _) => Rc::new(Delegator::unbound(label)),
            (PortStyle::Containers, true) => Rc::new(Container::sentinel(label)),
            (PortStyle::Containers, false) => Rc::new(Container::new(label)),
        }
    }

    fn declare_inputs(&self, names: &[String]) {
        for name in names {
            if !self.inputs.contains(name) {
                let port = self.new_port(name, self.config.is_optional(name));
                self.inputs.replace_port(name, port);
            }
        }
    }

    fn declare_outputs(&self, names: &[String]) {
        for name in names {
            if !self.outputs.contains(name) {
                self.outputs.replace_port(name, self.new_port(name, false));
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &OperationConfig {
        &self.config
    }

    pub fn input_names(&self) -> &[String] {
        &self.config.input_names
    }

    pub fn output_names(&self) -> &[String] {
        &self.config.output_names
    }

    pub fn inputs(&self) -> &Rc<Manager> {
        &self.inputs
    }

    pub fn outputs(&self) -> &Rc<Manager> {
        &self.outputs
    }

    pub fn strategy(&self) -> DispatchStrategy {
        self.strategy
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    pub(crate) fn mark_ready(&mut self) {
        self.state = OperationState::Ready;
    }

    /// Drops back from `Ready` once the wiring no longer matches the
    /// children. An unconfigured operation stays unconfigured.
    pub(crate) fn mark_declared(&mut self) {
        if self.state == OperationState::Ready {
            self.state = OperationState::PortsDeclared;
        }
    }

    pub fn ensure_configured(&self) -> FlowResult<()> {
        match self.state {
            OperationState::Unconfigured => Err(FlowError::Configuration(format!(
                "operation '{}' has no configuration",
                self.name
            ))),
            _ => Ok(()),
        }
    }

    pub fn ensure_ready(&self) -> FlowResult<()> {
        match self.state {
            OperationState::Ready => Ok(()),
            state => Err(FlowError::Configuration(format!(
                "operation '{}' is not ready ({:?})",
                self.name, state
            ))),
        }
    }

    /// Replaces the declared inputs, creating ports for new names and
    /// dropping ports for names no longer declared.
    pub fn set_input_names(&mut self, names: Vec<String>) -> FlowResult<()> {
        let mut config = self.config.clone();
        config.input_names = names;
        config.optional_inputs.retain(|n| config.input_names.contains(n));
        config.validate()?;

        for stale in self.inputs.names() {
            if !config.input_names.contains(&stale) {
                self.inputs.remove(&stale);
            }
        }
        self.config = config;
        let names = self.config.input_names.clone();
        self.declare_inputs(&names);
        Ok(())
    }

    /// Replaces the declared outputs and re-derives the dispatch strategy
    /// unless [`DispatchStrategy::Mapping`] was selected explicitly.
    pub fn set_output_names(&mut self, names: Vec<String>) -> FlowResult<()> {
        let mut config = self.config.clone();
        config.output_names = names;
        config.validate()?;

        for stale in self.outputs.names() {
            if !config.output_names.contains(&stale) {
                self.outputs.remove(&stale);
            }
        }
        self.config = config;
        let names = self.config.output_names.clone();
        self.declare_outputs(&names);

        if !self.pinned {
            self.apply_strategy(DispatchStrategy::from_arity(self.config.arity()));
        }
        Ok(())
    }

    /// Selects a strategy by hand. Arity-based strategies must agree with the
    /// declared outputs; `Mapping` sticks until another strategy is selected.
    pub fn select_strategy(&mut self, strategy: DispatchStrategy) -> FlowResult<()> {
        if strategy != DispatchStrategy::Mapping
            && strategy != DispatchStrategy::from_arity(self.config.arity())
        {
            return Err(FlowError::Configuration(format!(
                "operation '{}' declares {} outputs and cannot use {} dispatch",
                self.name,
                self.config.arity(),
                strategy.name()
            )));
        }
        self.pinned = strategy == DispatchStrategy::Mapping;
        self.apply_strategy(strategy);
        Ok(())
    }

    fn apply_strategy(&mut self, strategy: DispatchStrategy) {
        self.strategy = strategy;
        self.push = strategy.push_fn();
    }

    /// Adopts another manager as the inputs, e.g. a child's whole input set.
    pub fn replace_inputs(&mut self, manager: Rc<Manager>) -> FlowResult<()> {
        self.check_covers(&manager, &self.config.input_names)?;
        self.inputs = manager;
        Ok(())
    }

    pub fn replace_outputs(&mut self, manager: Rc<Manager>) -> FlowResult<()> {
        self.check_covers(&manager, &self.config.output_names)?;
        self.outputs = manager;
        Ok(())
    }

    fn check_covers(&self, manager: &Manager, names: &[String]) -> FlowResult<()> {
        match names.iter().find(|name| !manager.contains(name)) {
            Some(missing) => Err(FlowError::Configuration(format!(
                "replacement ports for '{}' lack '{}'",
                self.name, missing
            ))),
            None => Ok(()),
        }
    }

    /// Reads every declared input, in declaration order.
    ///
    /// When any input is not ready the call fails before consuming the
    /// others, so pending values survive for a retry.
    pub fn gather_inputs(&self) -> FlowResult<ValueMap> {
        let names = &self.config.input_names;
        let values = self.inputs.get_items(names)?;
        Ok(names.iter().cloned().zip(values).collect())
    }

    /// Pushes an evaluation result through the selected strategy.
    pub fn push(&self, outcome: Outcome) -> FlowResult<()> {
        (self.push)(self, outcome)
    }

    pub fn output_as_map(&self, values: Vec<Value>) -> ValueMap {
        self.config
            .output_names
            .iter()
            .cloned()
            .zip(values)
            .collect()
    }

    /// Orders named outputs positionally; absent names read as `Empty`.
    pub fn output_as_tuple(&self, values: &ValueMap) -> Vec<Value> {
        self.config
            .output_names
            .iter()
            .map(|name| values.get(name).cloned().unwrap_or_default())
            .collect()
    }

    fn shape_error(&self, outcome: &Outcome) -> FlowError {
        FlowError::Configuration(format!(
            "operation '{}' declares {} outputs ({} dispatch) but evaluate returned {}",
            self.name,
            self.config.arity(),
            self.strategy.name(),
            outcome.shape_name()
        ))
    }

    pub fn describe(&self, children: Vec<OperationMap>) -> OperationMap {
        OperationMap {
            name: self.name.clone(),
            strategy: self.strategy,
            state: self.state,
            inputs: crate::io::Port::port_map(self.inputs.as_ref()),
            outputs: crate::io::Port::port_map(self.outputs.as_ref()),
            children,
        }
    }
}

/// Serializable wiring snapshot of an operation and its children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationMap {
    pub name: String,
    pub strategy: DispatchStrategy,
    pub state: OperationState,
    pub inputs: PortMap,
    pub outputs: PortMap,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OperationMap>,
}

impl OperationMap {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A named unit of computation with input and output ports.
pub trait Operation {
    fn io(&self) -> &OperationIo;

    fn io_mut(&mut self) -> &mut OperationIo;

    /// Computes outputs from named inputs without touching any port.
    fn evaluate(&mut self, inputs: ValueMap) -> FlowResult<Outcome>;

    /// Reads the input ports, computes, and writes the output ports.
    fn execute(&mut self) -> FlowResult<()>;

    fn name(&self) -> &str {
        self.io().name()
    }

    fn inputs(&self) -> &Rc<Manager> {
        self.io().inputs()
    }

    fn outputs(&self) -> &Rc<Manager> {
        self.io().outputs()
    }

    fn state(&self) -> OperationState {
        self.io().state()
    }

    fn describe(&self) -> OperationMap {
        self.io().describe(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{Port, PortKind};

    fn leaf_io(outputs: &[&str]) -> OperationIo {
        let config = OperationConfig::new(["x"], outputs.iter().copied());
        OperationIo::declare("op", config, PortStyle::Containers).unwrap()
    }

    #[test]
    fn strategy_follows_arity() {
        assert_eq!(leaf_io(&[]).strategy(), DispatchStrategy::None);
        assert_eq!(leaf_io(&["a"]).strategy(), DispatchStrategy::One);
        assert_eq!(leaf_io(&["a", "b", "c"]).strategy(), DispatchStrategy::Many);
    }

    #[test]
    fn declared_ports_are_labelled_by_operation() {
        let io = leaf_io(&["y"]);
        assert_eq!(io.state(), OperationState::PortsDeclared);
        assert_eq!(io.inputs().port("x").unwrap().label(), "op.x");
        assert_eq!(io.outputs().port("y").unwrap().kind(), PortKind::Container);
    }

    #[test]
    fn changing_outputs_rederives_strategy_and_ports() {
        let mut io = leaf_io(&["a"]);
        io.set_output_names(vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(io.strategy(), DispatchStrategy::Many);
        assert_eq!(io.outputs().names(), vec!["a", "b"]);

        io.set_output_names(Vec::new()).unwrap();
        assert_eq!(io.strategy(), DispatchStrategy::None);
        assert!(io.outputs().is_empty());
    }

    #[test]
    fn mapping_strategy_is_pinned() {
        let mut io = leaf_io(&["a"]);
        io.select_strategy(DispatchStrategy::Mapping).unwrap();
        io.set_output_names(vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(io.strategy(), DispatchStrategy::Mapping);

        assert!(io.select_strategy(DispatchStrategy::One).is_err());
        io.select_strategy(DispatchStrategy::Many).unwrap();
        io.set_output_names(vec!["a".into()]).unwrap();
        assert_eq!(io.strategy(), DispatchStrategy::One);
    }

    #[test]
    fn wrong_shape_is_a_configuration_error() {
        let io = leaf_io(&["a", "b"]);
        let err = io.push(Outcome::One(Value::from(1))).unwrap_err();
        assert!(err.to_string().contains("declares 2 outputs"));

        let err = io
            .push(Outcome::Many(vec![Value::from(1)]))
            .unwrap_err();
        assert!(matches!(err, FlowError::Configuration(_)));
    }

    #[test]
    fn positional_and_named_outputs_convert() {
        let io = leaf_io(&["a", "b"]);
        let named = io.output_as_map(vec![Value::from(1), Value::from(2)]);
        assert_eq!(named.get("b"), Some(&Value::from(2)));

        let partial: ValueMap = [("b", Value::from(5))].into_iter().collect();
        assert_eq!(
            io.output_as_tuple(&partial),
            vec![Value::Empty, Value::from(5)]
        );
    }

    #[test]
    fn describe_serializes_port_kinds() {
        let io = leaf_io(&["y"]);
        let json = io.describe(Vec::new()).to_json_pretty().unwrap();
        assert!(json.contains("\"strategy\": \"one\""));
        assert!(json.contains("\"kind\": \"container\""));
        assert!(!json.contains("children"));
    }

    #[test]
    fn replacement_inputs_must_cover_declared_names() {
        let mut io = leaf_io(&["y"]);
        let empty = Rc::new(Manager::new("other"));
        assert!(io.replace_inputs(empty).is_err());

        let covering = Rc::new(Manager::new("other"));
        covering.create_containers(["x"]);
        io.replace_inputs(covering.clone()).unwrap();
        assert!(Rc::ptr_eq(io.inputs(), &covering));
    }

    #[test]
    fn configuration_happens_once() {
        let mut io = OperationIo::unconfigured("late", PortStyle::Containers).unwrap();
        assert_eq!(io.state(), OperationState::Unconfigured);
        assert!(io.inputs().is_empty());
        assert!(io.ensure_configured().is_err());

        io.configure(OperationConfig::new(["x"], ["y", "z"])).unwrap();
        assert_eq!(io.state(), OperationState::PortsDeclared);
        assert_eq!(io.strategy(), DispatchStrategy::Many);
        assert_eq!(io.inputs().port("x").unwrap().label(), "late.x");

        let err = io.configure(OperationConfig::default()).unwrap_err();
        assert!(err.to_string().contains("already configured"));
        assert_eq!(io.output_names().len(), 2);
    }
}
