use crate::io::port::{Port, PortKind};
use crate::prelude::{FlowError, FlowResult};
use crate::value::Value;
use std::cell::RefCell;

/// What a [`Container`] does when read while empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyPolicy {
    #[default]
    Fail,
    /// Hand back [`Value::Empty`].
    Sentinel,
}

/// Port holding at most one pending value. Reading consumes it.
#[derive(Debug)]
pub struct Container {
    label: String,
    slot: RefCell<Option<Value>>,
    policy: EmptyPolicy,
}

impl Container {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_policy(label, EmptyPolicy::Fail)
    }

    pub fn sentinel(label: impl Into<String>) -> Self {
        Self::with_policy(label, EmptyPolicy::Sentinel)
    }

    pub fn with_policy(label: impl Into<String>, policy: EmptyPolicy) -> Self {
        Self {
            label: label.into(),
            slot: RefCell::new(None),
            policy,
        }
    }

    pub fn policy(&self) -> EmptyPolicy {
        self.policy
    }

    pub fn is_filled(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Copy of the pending value without consuming it.
    pub fn peek(&self) -> Option<Value> {
        self.slot.borrow().clone()
    }
}

impl Port for Container {
    fn get(&self) -> FlowResult<Value> {
        self.check_ready()?;
        Ok(self.slot.borrow_mut().take().unwrap_or_default())
    }

    fn check_ready(&self) -> FlowResult<()> {
        if self.policy == EmptyPolicy::Fail && !self.is_filled() {
            return Err(FlowError::PortEmpty {
                port: self.label.clone(),
            });
        }
        Ok(())
    }

    fn put(&self, value: Value) -> FlowResult<()> {
        *self.slot.borrow_mut() = Some(value);
        Ok(())
    }

    fn kind(&self) -> PortKind {
        PortKind::Container
    }

    fn label(&self) -> &str {
        &self.label
    }
}
