use crate::io::port::{Port, PortKind, PortLink, PortRef};
use crate::prelude::{FlowError, FlowResult};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Port that forwards to a rebindable target.
///
/// Holders keep the delegator itself; rebinding swaps only where it
/// forwards, so wiring can be declared before the real port exists.
#[derive(Debug)]
pub struct Delegator {
    label: String,
    target: RefCell<Option<PortRef>>,
}

impl Delegator {
    pub fn unbound(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: RefCell::new(None),
        }
    }

    pub fn bound(label: impl Into<String>, target: PortRef) -> Self {
        Self {
            label: label.into(),
            target: RefCell::new(Some(target)),
        }
    }

    pub fn target(&self) -> Option<PortRef> {
        self.target.borrow().clone()
    }

    pub fn is_bound(&self) -> bool {
        self.target.borrow().is_some()
    }

    /// Points this delegator at `target`.
    ///
    /// Fails when `target` forwards back to this delegator.
    pub fn rebind(&self, target: PortRef) -> FlowResult<()> {
        if self.reachable_from(&target) {
            return Err(FlowError::Configuration(format!(
                "rebinding delegator '{}' to '{}' would forward to itself",
                self.label,
                target.label()
            )));
        }
        *self.target.borrow_mut() = Some(target);
        Ok(())
    }

    pub fn unbind(&self) -> Option<PortRef> {
        self.target.borrow_mut().take()
    }

    /// Follows the delegator chain to the last port that is not a delegator.
    pub fn resolve(&self) -> FlowResult<PortRef> {
        let mut current = self.bound_target()?;
        loop {
            let next = match current.as_delegator() {
                Some(delegator) => delegator.bound_target()?,
                None => return Ok(current),
            };
            current = next;
        }
    }

    fn bound_target(&self) -> FlowResult<PortRef> {
        self.target().ok_or_else(|| FlowError::PortUnbound {
            port: self.label.clone(),
        })
    }

    /// Walks every port reachable from `start`, through routers and
    /// managers as well as delegators.
    fn reachable_from(&self, start: &PortRef) -> bool {
        let me = self as *const Delegator as *const ();
        let mut seen = HashSet::new();
        let mut pending = vec![start.clone()];
        while let Some(port) = pending.pop() {
            let address = Rc::as_ptr(&port) as *const ();
            if address == me {
                return true;
            }
            if seen.insert(address) {
                pending.extend(port.targets());
            }
        }
        false
    }
}

impl Port for Delegator {
    fn get(&self) -> FlowResult<Value> {
        self.resolve()?.get()
    }

    fn put(&self, value: Value) -> FlowResult<()> {
        self.resolve()?.put(value)
    }

    fn check_ready(&self) -> FlowResult<()> {
        self.resolve()?.check_ready()
    }

    fn kind(&self) -> PortKind {
        PortKind::Delegator
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn links(&self) -> Vec<PortLink> {
        match self.target() {
            Some(target) => vec![PortLink::new("target", target.as_ref())],
            None => Vec::new(),
        }
    }

    fn targets(&self) -> Vec<PortRef> {
        self.target().into_iter().collect()
    }

    fn as_delegator(&self) -> Option<&Delegator> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::container::Container;
    use crate::io::manager::Manager;
    use crate::io::router::Router;

    #[test]
    fn unbound_delegator_fails_both_ways() {
        let delegator = Delegator::unbound("out");
        assert!(matches!(
            delegator.get(),
            Err(FlowError::PortUnbound { ref port }) if port == "out"
        ));
        assert!(delegator.put(Value::from(1)).is_err());
    }

    #[test]
    fn chain_resolves_to_last_concrete_port() {
        let container = Rc::new(Container::new("leaf"));
        let inner: PortRef = Rc::new(Delegator::bound("inner", container.clone()));
        let outer = Delegator::bound("outer", inner);

        outer.put(Value::from(11)).unwrap();
        assert_eq!(container.get().unwrap(), Value::from(11));
        assert_eq!(outer.resolve().unwrap().label(), "leaf");
    }

    #[test]
    fn rebinding_into_a_cycle_is_rejected() {
        let first = Rc::new(Delegator::unbound("first"));
        let second: PortRef = Rc::new(Delegator::bound("second", first.clone()));

        let err = first.rebind(second).unwrap_err();
        assert!(matches!(err, FlowError::Configuration(_)));
        assert!(!first.is_bound());

        let same: PortRef = first.clone();
        assert!(first.rebind(same).is_err());
    }

    #[test]
    fn cycles_through_composite_ports_are_rejected() {
        let delegator = Rc::new(Delegator::unbound("loop"));
        let router = Rc::new(Router::new("fan"));
        router.add_target("back", delegator.clone());
        let err = delegator.rebind(router.clone()).unwrap_err();
        assert!(matches!(err, FlowError::Configuration(_)));

        let holder = Manager::new("outer");
        holder.replace_port("inner", delegator.clone());
        let holder: PortRef = Rc::new(holder);
        assert!(delegator.rebind(holder).is_err());
        assert!(!delegator.is_bound());
    }
}
