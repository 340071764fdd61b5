pub mod base;
pub mod group;
pub mod leaf;
pub mod linker;

pub use base::{DispatchStrategy, Operation, OperationIo, OperationMap, OperationState};
pub use group::{GroupLayout, OperationGroup, SetupOptions};
pub use leaf::{FnKernel, LeafOperation};
pub use linker::{Children, Linker};
