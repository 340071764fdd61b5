use crate::io::delegator::Delegator;
use crate::io::router::Router;
use crate::prelude::FlowResult;
use crate::value::Value;
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a port. Every holder observes the same slot.
pub type PortRef = Rc<dyn Port>;

/// Single-slot (or composite) value channel.
///
/// `put` never blocks and never queues: it replaces whatever was pending.
pub trait Port: fmt::Debug {
    fn get(&self) -> FlowResult<Value>;

    fn put(&self, value: Value) -> FlowResult<()>;

    fn kind(&self) -> PortKind;

    fn label(&self) -> &str;

    /// Fails with the error `get` would raise, without consuming anything.
    fn check_ready(&self) -> FlowResult<()> {
        Ok(())
    }

    /// Ports this one forwards to or aggregates over.
    fn links(&self) -> Vec<PortLink> {
        Vec::new()
    }

    /// Handles of the ports listed by `links`.
    fn targets(&self) -> Vec<PortRef> {
        Vec::new()
    }

    fn port_map(&self) -> PortMap {
        PortMap {
            kind: self.kind(),
            label: self.label().to_string(),
            links: self.links(),
        }
    }

    fn as_delegator(&self) -> Option<&Delegator> {
        None
    }

    fn as_router(&self) -> Option<&Router> {
        None
    }
}

/// True when both handles point at the same port object.
pub fn same_port(lhs: &PortRef, rhs: &PortRef) -> bool {
    Rc::ptr_eq(lhs, rhs)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    Container,
    Router,
    Delegator,
    Manager,
    Appender,
    Custom,
}

/// Serializable description of a port and everything reachable from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortMap {
    pub kind: PortKind,
    pub label: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<PortLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortLink {
    pub name: String,
    pub port: PortMap,
}

impl PortLink {
    pub fn new(name: impl Into<String>, port: &dyn Port) -> Self {
        Self {
            name: name.into(),
            port: port.port_map(),
        }
    }
}
