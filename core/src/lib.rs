//! Operation/port dataflow engine.
//!
//! Operations declare named input and output ports, share port objects to
//! pass values between each other, and compose into ordered groups that are
//! operations themselves.

pub mod io;
pub mod math;
pub mod operation;
pub mod ordered;
pub mod prelude;
pub mod processing;
pub mod telemetry;
pub mod value;

pub use io::{Port, PortRef};
pub use operation::{LeafOperation, Operation, OperationGroup};
pub use prelude::{Evaluate, FlowError, FlowResult, OperationConfig, Outcome};
pub use value::{Value, ValueMap};
