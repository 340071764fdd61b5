use crate::io::container::Container;
use crate::io::delegator::Delegator;
use crate::io::port::{Port, PortKind, PortLink, PortRef};
use crate::ordered::OrderedMap;
use crate::prelude::{FlowError, FlowResult};
use crate::value::{Value, ValueMap};
use std::cell::RefCell;
use std::rc::Rc;

/// What `put_all` does with a name that has no port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Drop the value.
    #[default]
    Ignore,
    /// Create a container for it on first put.
    Create,
    Reject,
}

/// Named collection of ports, usable as a port itself.
///
/// Assigning into a slot that currently holds a [`Delegator`] rebinds the
/// delegator instead of replacing the slot, so anyone who captured the
/// delegator earlier reads through to the new port.
#[derive(Debug)]
pub struct Manager {
    label: String,
    ports: RefCell<OrderedMap<PortRef>>,
    missing: MissingPolicy,
}

impl Manager {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_policy(label, MissingPolicy::default())
    }

    pub fn with_policy(label: impl Into<String>, missing: MissingPolicy) -> Self {
        Self {
            label: label.into(),
            ports: RefCell::new(OrderedMap::new()),
            missing,
        }
    }

    pub fn missing_policy(&self) -> MissingPolicy {
        self.missing
    }

    /// Creates one port per name with `factory`, replacing existing slots.
    pub fn create_io<I, F>(&self, names: I, factory: F)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        F: Fn(&str) -> PortRef,
    {
        let mut ports = self.ports.borrow_mut();
        for name in names {
            let name = name.as_ref();
            ports.insert(name, factory(name));
        }
    }

    pub fn create_containers<I>(&self, names: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.create_io(names, |name| Rc::new(Container::new(name)) as PortRef);
    }

    pub fn create_delegators<I>(&self, names: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.create_io(names, |name| Rc::new(Delegator::unbound(name)) as PortRef);
    }

    pub fn len(&self) -> usize {
        self.ports.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.borrow().is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ports.borrow().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.ports.borrow().keys().map(str::to_string).collect()
    }

    pub fn port(&self, name: &str) -> Option<PortRef> {
        self.ports.borrow().get(name).cloned()
    }

    pub fn require_port(&self, name: &str) -> FlowResult<PortRef> {
        self.port(name).ok_or_else(|| {
            FlowError::Configuration(format!("'{}' has no port named '{}'", self.label, name))
        })
    }

    /// Item assignment: rebinds an existing delegator, otherwise stores
    /// `port` under `name`.
    pub fn set_port(&self, name: &str, port: PortRef) -> FlowResult<()> {
        if let Some(existing) = self.port(name) {
            if let Some(delegator) = existing.as_delegator() {
                return delegator.rebind(port);
            }
        }
        self.ports.borrow_mut().insert(name, port);
        Ok(())
    }

    /// Stores `port` under `name` even when the slot holds a delegator.
    pub fn replace_port(&self, name: &str, port: PortRef) -> Option<PortRef> {
        self.ports.borrow_mut().insert(name, port)
    }

    pub fn remove(&self, name: &str) -> Option<PortRef> {
        self.ports.borrow_mut().remove(name)
    }

    /// Assigns many ports at once; `None` stands for a fresh container.
    pub fn update_io<I, K>(&self, ports: I) -> FlowResult<()>
    where
        I: IntoIterator<Item = (K, Option<PortRef>)>,
        K: AsRef<str>,
    {
        for (name, port) in ports {
            let name = name.as_ref();
            let port = port.unwrap_or_else(|| Rc::new(Container::new(name)) as PortRef);
            self.set_port(name, port)?;
        }
        Ok(())
    }

    fn snapshot(&self) -> Vec<(String, PortRef)> {
        self.ports
            .borrow()
            .iter()
            .map(|(name, port)| (name.to_string(), port.clone()))
            .collect()
    }

    pub fn get_item(&self, name: &str) -> FlowResult<Value> {
        self.require_port(name)?.get()
    }

    /// Reads the named ports in the order given. Nothing is consumed unless
    /// every named port is ready.
    pub fn get_items<I>(&self, names: I) -> FlowResult<Vec<Value>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let ports = names
            .into_iter()
            .map(|name| self.require_port(name.as_ref()))
            .collect::<FlowResult<Vec<_>>>()?;
        for port in &ports {
            port.check_ready()?;
        }
        ports.iter().map(|port| port.get()).collect()
    }

    /// Reads every port. Nothing is consumed unless all of them are ready.
    pub fn get_all(&self) -> FlowResult<ValueMap> {
        let ports = self.snapshot();
        for (_, port) in &ports {
            port.check_ready()?;
        }
        let mut values = ValueMap::with_capacity(ports.len());
        for (name, port) in ports {
            let value = port.get()?;
            values.insert(name, value);
        }
        Ok(values)
    }

    pub fn put_item(&self, name: &str, value: Value) -> FlowResult<()> {
        self.require_port(name)?.put(value)
    }

    pub fn put_all(&self, values: ValueMap) -> FlowResult<()> {
        for (name, value) in values {
            match self.port(&name) {
                Some(port) => port.put(value)?,
                None => match self.missing {
                    MissingPolicy::Ignore => {}
                    MissingPolicy::Create => {
                        let port: PortRef = Rc::new(Container::new(name.as_str()));
                        port.put(value)?;
                        self.ports.borrow_mut().insert(name, port);
                    }
                    MissingPolicy::Reject => {
                        return Err(FlowError::Configuration(format!(
                            "'{}' has no port named '{}'",
                            self.label, name
                        )))
                    }
                },
            }
        }
        Ok(())
    }
}

impl Port for Manager {
    fn get(&self) -> FlowResult<Value> {
        self.get_all().map(Value::Map)
    }

    fn check_ready(&self) -> FlowResult<()> {
        self.snapshot()
            .iter()
            .try_for_each(|(_, port)| port.check_ready())
    }

    fn put(&self, value: Value) -> FlowResult<()> {
        match value {
            Value::Map(values) => self.put_all(values),
            other => Err(FlowError::Configuration(format!(
                "'{}' expects a map of named values, got {}",
                self.label,
                other.kind_name()
            ))),
        }
    }

    fn kind(&self) -> PortKind {
        PortKind::Manager
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn create_io_keeps_declaration_order() {
        let manager = Manager::new("inputs");
        manager.create_containers(["data", "scale", "offset"]);
        assert_eq!(manager.names(), vec!["data", "scale", "offset"]);
    }

    #[test]
    fn assigning_over_a_delegator_rebinds_it() {
        let manager = Manager::new("outputs");
        manager.create_delegators(["result"]);
        let captured = manager.port("result").unwrap();

        let container = Rc::new(Container::new("real"));
        manager.set_port("result", container.clone()).unwrap();

        assert!(Rc::ptr_eq(&captured, &manager.port("result").unwrap()));
        container.put(Value::from(3)).unwrap();
        assert_eq!(captured.get().unwrap(), Value::from(3));
    }

    #[test]
    fn assigning_over_a_container_replaces_it() {
        let manager = Manager::new("inputs");
        manager.create_containers(["x"]);
        let replacement: PortRef = Rc::new(Container::new("shared"));
        manager.set_port("x", replacement.clone()).unwrap();
        assert!(Rc::ptr_eq(&replacement, &manager.port("x").unwrap()));
    }

    #[test]
    fn bulk_round_trip_through_the_port_interface() {
        let manager = Manager::new("io");
        manager.create_containers(["a", "b"]);
        let values: ValueMap = [("b", Value::from(2)), ("a", Value::from(1))]
            .into_iter()
            .collect();
        manager.put(Value::Map(values)).unwrap();

        let read = manager.get().unwrap().into_map().unwrap();
        assert_eq!(read.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(read.get("a"), Some(&Value::from(1)));
        assert!(manager.put(Value::from(1)).is_err());
    }

    #[test]
    fn bulk_reads_are_all_or_nothing() {
        let manager = Manager::new("io");
        manager.create_containers(["a", "b"]);
        manager.put_item("a", Value::from(1)).unwrap();

        assert!(manager.get_all().is_err());
        assert!(manager.get_items(["a", "b"]).is_err());
        assert!(manager.check_ready().is_err());

        manager.put_item("b", Value::from(2)).unwrap();
        assert_eq!(
            manager.get_items(["b", "a"]).unwrap(),
            vec![Value::from(2), Value::from(1)]
        );
    }

    #[test]
    fn missing_names_follow_the_policy() {
        let values = || -> ValueMap { [("late", Value::from(1))].into_iter().collect() };

        let ignoring = Manager::new("ignore");
        ignoring.put_all(values()).unwrap();
        assert!(ignoring.is_empty());

        let creating = Manager::with_policy("create", MissingPolicy::Create);
        creating.put_all(values()).unwrap();
        assert_eq!(creating.get_item("late").unwrap(), Value::from(1));

        let rejecting = Manager::with_policy("reject", MissingPolicy::Reject);
        assert!(matches!(
            rejecting.put_all(values()),
            Err(FlowError::Configuration(_))
        ));
    }

    #[test]
    fn nested_managers_read_as_nested_maps() {
        let inner = Rc::new(Manager::new("inner"));
        inner.create_containers(["x"]);
        let outer = Manager::new("outer");
        outer.set_port("group", inner.clone()).unwrap();

        inner.put_item("x", Value::from(7)).unwrap();
        let read = outer.get_all().unwrap();
        let group = read.get("group").and_then(Value::as_map).unwrap();
        assert_eq!(group.get("x"), Some(&Value::from(7)));
    }

    #[test]
    fn update_io_fills_none_with_containers() {
        let manager = Manager::new("io");
        manager
            .update_io([("fresh", None), ("given", Some(Rc::new(Container::new("g")) as PortRef))])
            .unwrap();
        assert_eq!(manager.port("fresh").unwrap().kind(), PortKind::Container);
        assert_eq!(manager.port("given").unwrap().label(), "g");
        assert_eq!(
            manager.get_items(["fresh"]).unwrap_err().to_string(),
            "port 'fresh' is empty"
        );
    }
}
