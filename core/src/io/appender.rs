use crate::io::port::{Port, PortKind};
use crate::prelude::FlowResult;
use crate::value::Value;
use std::cell::RefCell;

/// Port that gathers every `put` and hands them out together as a list.
///
/// Lets several producers feed one consumer input. Reading clears it; an
/// appender that received nothing reads as an empty list.
#[derive(Debug)]
pub struct Appender {
    label: String,
    items: RefCell<Vec<Value>>,
}

impl Appender {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            items: RefCell::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl Port for Appender {
    fn get(&self) -> FlowResult<Value> {
        Ok(Value::List(std::mem::take(&mut *self.items.borrow_mut())))
    }

    fn put(&self, value: Value) -> FlowResult<()> {
        self.items.borrow_mut().push(value);
        Ok(())
    }

    fn kind(&self) -> PortKind {
        PortKind::Appender
    }

    fn label(&self) -> &str {
        &self.label
    }
}
