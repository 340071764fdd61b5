use crate::io::port::{Port, PortKind, PortLink, PortRef};
use crate::ordered::OrderedMap;
use crate::prelude::{FlowError, FlowResult};
use crate::value::{Value, ValueMap};
use std::cell::RefCell;

/// Port that broadcasts one value to many targets.
///
/// `put` hands the same value to every target in declaration order; `get`
/// reads each target once and returns the collected mapping.
#[derive(Debug)]
pub struct Router {
    label: String,
    targets: RefCell<OrderedMap<PortRef>>,
}

impl Router {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            targets: RefCell::new(OrderedMap::new()),
        }
    }

    pub fn with_targets<I, K>(label: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = (K, PortRef)>,
        K: Into<String>,
    {
        Self {
            label: label.into(),
            targets: RefCell::new(targets.into_iter().collect()),
        }
    }

    pub fn add_target(&self, name: impl Into<String>, port: PortRef) {
        self.targets.borrow_mut().insert(name, port);
    }

    pub fn target(&self, name: &str) -> Option<PortRef> {
        self.targets.borrow().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.targets.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.borrow().is_empty()
    }

    fn snapshot(&self) -> Vec<(String, PortRef)> {
        self.targets
            .borrow()
            .iter()
            .map(|(name, port)| (name.to_string(), port.clone()))
            .collect()
    }

    fn require(&self, name: &str) -> FlowResult<PortRef> {
        self.target(name).ok_or_else(|| {
            FlowError::Configuration(format!(
                "router '{}' has no target '{}'",
                self.label, name
            ))
        })
    }

    pub fn get_item(&self, name: &str) -> FlowResult<Value> {
        self.require(name)?.get()
    }

    /// Puts into a single named target instead of broadcasting.
    pub fn put_item(&self, name: &str, value: Value) -> FlowResult<()> {
        self.require(name)?.put(value)
    }

    /// Reads every target. Nothing is consumed unless all targets are ready.
    pub fn get_all(&self) -> FlowResult<ValueMap> {
        let targets = self.snapshot();
        for (_, port) in &targets {
            port.check_ready()?;
        }
        let mut values = ValueMap::with_capacity(targets.len());
        for (name, port) in targets {
            let value = port.get()?;
            values.insert(name, value);
        }
        Ok(values)
    }

    pub fn put_all(&self, value: Value) -> FlowResult<()> {
        for (_, port) in self.snapshot() {
            port.put(value.clone())?;
        }
        Ok(())
    }
}

impl Port for Router {
    fn get(&self) -> FlowResult<Value> {
        self.get_all().map(Value::Map)
    }

    fn put(&self, value: Value) -> FlowResult<()> {
        self.put_all(value)
    }

    fn check_ready(&self) -> FlowResult<()> {
        self.snapshot()
            .iter()
            .try_for_each(|(_, port)| port.check_ready())
    }

    fn kind(&self) -> PortKind {
        PortKind::Router
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn links(&self) -> Vec<PortLink> {
        self.snapshot()
            .into_iter()
            .map(|(name, port)| PortLink::new(name, port.as_ref()))
            .collect()
    }

    fn targets(&self) -> Vec<PortRef> {
        self.snapshot().into_iter().map(|(_, port)| port).collect()
    }

    fn as_router(&self) -> Option<&Router> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::container::Container;
    use ndarray::array;
    use std::rc::Rc;

    fn three_targets() -> (Rc<Container>, Rc<Container>, Rc<Container>, Router) {
        let a = Rc::new(Container::new("a"));
        let b = Rc::new(Container::new("b"));
        let c = Rc::new(Container::new("c"));
        let router = Router::with_targets(
            "fan_out",
            [
                ("a", a.clone() as PortRef),
                ("b", b.clone() as PortRef),
                ("c", c.clone() as PortRef),
            ],
        );
        (a, b, c, router)
    }

    #[test]
    fn put_reaches_every_target() {
        let (a, b, c, router) = three_targets();
        router.put(Value::from(5)).unwrap();
        assert_eq!(a.get().unwrap(), Value::from(5));
        assert_eq!(b.get().unwrap(), Value::from(5));
        assert_eq!(c.get().unwrap(), Value::from(5));
    }

    #[test]
    fn broadcast_arrays_are_the_same_object() {
        let (a, b, _c, router) = three_targets();
        router.put(Value::from(array![1.0, 2.0])).unwrap();
        let first = a.get().unwrap();
        let second = b.get().unwrap();
        assert!(first.shares_array_with(&second));
    }

    #[test]
    fn get_collects_by_target_name() {
        let (_a, _b, _c, router) = three_targets();
        router.put(Value::from("x")).unwrap();
        let collected = router.get().unwrap().into_map().unwrap();
        assert_eq!(collected.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert!(collected.values().all(|v| v == &Value::from("x")));
    }

    #[test]
    fn put_item_targets_one_port() {
        let (a, b, _c, router) = three_targets();
        router.put_item("b", Value::from(9)).unwrap();
        assert!(!a.is_filled());
        assert_eq!(b.get().unwrap(), Value::from(9));
        assert!(router.put_item("missing", Value::from(1)).is_err());
    }

    #[test]
    fn get_all_leaves_targets_alone_when_one_is_empty() {
        let (a, b, _c, router) = three_targets();
        router.put_item("a", Value::from(1)).unwrap();
        router.put_item("b", Value::from(2)).unwrap();

        assert!(matches!(
            router.get_all(),
            Err(FlowError::PortEmpty { ref port }) if port == "c"
        ));
        assert!(a.is_filled());
        assert!(b.is_filled());
    }
}
