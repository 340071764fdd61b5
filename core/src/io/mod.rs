//! Ports: the single-slot channels operations read from and write to.

pub mod appender;
pub mod container;
pub mod delegator;
pub mod manager;
pub mod port;
pub mod router;

pub use appender::Appender;
pub use container::{Container, EmptyPolicy};
pub use delegator::Delegator;
pub use manager::{Manager, MissingPolicy};
pub use port::{same_port, Port, PortKind, PortLink, PortMap, PortRef};
pub use router::Router;
