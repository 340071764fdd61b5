use crate::io::{same_port, Appender, Container, Delegator, Manager, PortKind, PortRef, Router};
use crate::operation::base::{Operation, OperationIo};
use crate::ordered::OrderedMap;
use crate::prelude::{FlowError, FlowResult};
use std::rc::Rc;

/// Child operations of a group, in execution order.
pub type Children = OrderedMap<Box<dyn Operation>>;

/// Wiring context handed to a group's link phase.
///
/// Every helper assigns port objects between managers; nothing is copied at
/// execution time.
pub struct Linker<'a> {
    io: &'a mut OperationIo,
    children: &'a Children,
    links: usize,
}

impl<'a> Linker<'a> {
    pub(crate) fn new(io: &'a mut OperationIo, children: &'a Children) -> Self {
        Self {
            io,
            children,
            links: 0,
        }
    }

    pub fn io(&self) -> &OperationIo {
        &*self.io
    }

    pub fn links(&self) -> usize {
        self.links
    }

    pub fn child(&self, name: &str) -> FlowResult<&dyn Operation> {
        self.children
            .get(name)
            .map(|child| child.as_ref())
            .ok_or_else(|| {
                FlowError::Configuration(format!(
                    "group '{}' has no child '{}'",
                    self.io.name(),
                    name
                ))
            })
    }

    pub fn output_port(&self, child: &str, output: &str) -> FlowResult<PortRef> {
        self.child(child)?.outputs().require_port(output)
    }

    pub fn input_port(&self, child: &str, input: &str) -> FlowResult<PortRef> {
        self.child(child)?.inputs().require_port(input)
    }

    /// Slot that will be overwritten. Delegator slots belong to nested groups
    /// and rebinding them would cut the group off from its own children.
    fn owned_slot(&self, manager: &Manager, child: &str, port: &str) -> FlowResult<()> {
        let slot = manager.require_port(port)?;
        if slot.as_delegator().is_some() {
            return Err(FlowError::Configuration(format!(
                "port '{}' of '{}' is delegated; wire the nested group's children instead",
                port, child
            )));
        }
        Ok(())
    }

    /// Group outputs currently forwarding to `slot`.
    fn exposed_as(&self, slot: &PortRef) -> Vec<String> {
        let outputs = self.io.outputs();
        outputs
            .names()
            .into_iter()
            .filter(|name| {
                outputs
                    .port(name)
                    .and_then(|port| port.as_delegator().and_then(Delegator::target))
                    .map_or(false, |target| same_port(&target, slot))
            })
            .collect()
    }

    /// Adds a router target for the group output `name` and points the
    /// output at it.
    fn tap(&self, router: &Router, name: &str) -> FlowResult<()> {
        let label = format!("{}.{}", self.io.name(), name);
        let tap: PortRef = Rc::new(Container::new(label.clone()));
        router.add_target(label, tap.clone());
        self.io.outputs().set_port(name, tap)
    }

    fn refuse_exposed(&self, slot: &PortRef, child: &str, output: &str) -> FlowResult<()> {
        match self.exposed_as(slot).first() {
            Some(name) => Err(FlowError::Configuration(format!(
                "output '{}' of '{}' is exposed as group output '{}'; expose it after wiring",
                output, child, name
            ))),
            None => Ok(()),
        }
    }

    /// Makes `to.input` read what `from.output` writes.
    ///
    /// The downstream input slot adopts the upstream port. When the
    /// downstream slot is delegated (a nested group) the upstream output slot
    /// adopts the delegator instead.
    pub fn connect(&mut self, from: &str, output: &str, to: &str, input: &str) -> FlowResult<()> {
        let source = self.output_port(from, output)?;
        let sink = self.input_port(to, input)?;

        if sink.as_delegator().is_none() {
            self.child(to)?.inputs().set_port(input, source)?;
        } else {
            let upstream = self.child(from)?.outputs().clone();
            self.owned_slot(&upstream, from, output)?;
            self.refuse_exposed(&upstream.require_port(output)?, from, output)?;
            upstream.set_port(output, sink)?;
        }
        self.links += 1;
        Ok(())
    }

    /// Fans `from.output` out to several child inputs through a [`Router`].
    ///
    /// Group outputs already exposing `from.output` become router targets
    /// too, so they keep receiving its values.
    pub fn broadcast(
        &mut self,
        from: &str,
        output: &str,
        targets: &[(&str, &str)],
    ) -> FlowResult<Rc<Router>> {
        let upstream = self.child(from)?.outputs().clone();
        self.owned_slot(&upstream, from, output)?;
        let exposed = self.exposed_as(&upstream.require_port(output)?);

        let router = Rc::new(Router::new(format!("{}.{}", from, output)));
        for (child, input) in targets {
            let port = self.input_port(child, input)?;
            router.add_target(format!("{}.{}", child, input), port);
        }
        for name in &exposed {
            self.tap(&router, name)?;
        }
        upstream.set_port(output, router.clone())?;
        self.links += targets.len();
        Ok(router)
    }

    /// Collects several child outputs into one child input through an
    /// [`Appender`].
    pub fn gather(
        &mut self,
        sources: &[(&str, &str)],
        to: &str,
        input: &str,
    ) -> FlowResult<Rc<Appender>> {
        let downstream = self.child(to)?.inputs().clone();
        self.owned_slot(&downstream, to, input)?;
        for (child, output) in sources {
            let upstream = self.child(child)?.outputs().clone();
            self.owned_slot(&upstream, child, output)?;
            self.refuse_exposed(&upstream.require_port(output)?, child, output)?;
        }

        let appender = Rc::new(Appender::new(format!("{}.{}", to, input)));
        downstream.set_port(input, appender.clone())?;
        for (child, output) in sources {
            self.child(child)?
                .outputs()
                .set_port(output, appender.clone())?;
        }
        self.links += sources.len();
        Ok(appender)
    }

    /// Points the group's input `name` at `child.input`.
    pub fn expose_input(&mut self, name: &str, child: &str, input: &str) -> FlowResult<()> {
        let port = self.input_port(child, input)?;
        self.io.inputs().set_port(name, port)?;
        self.links += 1;
        Ok(())
    }

    /// Points the group's output `name` at `child.output`.
    ///
    /// A broadcast output gets its own router target. A gathered output
    /// cannot be exposed since its values only land in the appender.
    pub fn expose_output(&mut self, name: &str, child: &str, output: &str) -> FlowResult<()> {
        let port = self.output_port(child, output)?;
        if let Some(router) = port.as_router() {
            self.tap(router, name)?;
        } else if port.kind() == PortKind::Appender {
            return Err(FlowError::Configuration(format!(
                "output '{}' of '{}' is gathered and cannot be exposed",
                output, child
            )));
        } else {
            self.io.outputs().set_port(name, port)?;
        }
        self.links += 1;
        Ok(())
    }

    /// Adopts a child's whole input manager as the group's inputs.
    pub fn replace_inputs(&mut self, child: &str) -> FlowResult<()> {
        let manager = self.child(child)?.inputs().clone();
        self.io.replace_inputs(manager)?;
        self.links += 1;
        Ok(())
    }
}
