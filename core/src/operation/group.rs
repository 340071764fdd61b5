use crate::operation::base::{
    DispatchStrategy, Operation, OperationIo, OperationMap, PortStyle,
};
use crate::operation::linker::{Children, Linker};
use crate::prelude::{FlowError, FlowResult, OperationConfig, Outcome};
use crate::telemetry::{LogManager, MetricsRecorder};
use crate::value::ValueMap;

/// Builds the children of a group and wires them together.
///
/// `create` runs before `link`; both run once unless the group was built with
/// deferred [`SetupOptions`].
pub trait GroupLayout {
    fn create(&mut self, children: &mut Children) -> FlowResult<()>;

    fn link(&mut self, linker: &mut Linker<'_>) -> FlowResult<()>;
}

/// Which build phases run during construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupOptions {
    pub create: bool,
    pub link: bool,
}

impl SetupOptions {
    pub fn deferred() -> Self {
        Self {
            create: false,
            link: false,
        }
    }
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            create: true,
            link: true,
        }
    }
}

/// Operation composed of an ordered sequence of child operations.
///
/// The group's own ports are delegators that `link` points at child ports,
/// so callers see the same interface a leaf offers.
pub struct OperationGroup {
    io: OperationIo,
    children: Children,
    layout: Option<Box<dyn GroupLayout>>,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl OperationGroup {
    pub fn new(
        name: impl Into<String>,
        config: OperationConfig,
        layout: impl GroupLayout + 'static,
    ) -> FlowResult<Self> {
        Self::with_options(name, config, layout, SetupOptions::default())
    }

    pub fn with_options(
        name: impl Into<String>,
        config: OperationConfig,
        layout: impl GroupLayout + 'static,
        options: SetupOptions,
    ) -> FlowResult<Self> {
        let mut group = Self::empty(name, config, Some(Box::new(layout)))?;
        group.setup(options)?;
        Ok(group)
    }

    /// Seeds the group with pre-built children. Wiring is left to
    /// [`OperationGroup::link_with`].
    pub fn from_children<I>(name: impl Into<String>, config: OperationConfig, children: I) -> FlowResult<Self>
    where
        I: IntoIterator<Item = Box<dyn Operation>>,
    {
        let mut group = Self::empty(name, config, None)?;
        for child in children {
            group.add_child(child)?;
        }
        Ok(group)
    }

    /// Holds a layout without declaring any ports yet. Nothing can be built
    /// or executed until [`OperationGroup::configure`] supplies the names.
    pub fn unconfigured(name: impl Into<String>, layout: impl GroupLayout + 'static) -> FlowResult<Self> {
        Ok(Self {
            io: OperationIo::unconfigured(name, PortStyle::Delegators)?,
            children: Children::new(),
            layout: Some(Box::new(layout)),
            metrics: MetricsRecorder::new(),
            logger: LogManager::new(),
        })
    }

    /// Declares the group's ports from `config`, then runs `options`.
    pub fn configure(&mut self, config: OperationConfig, options: SetupOptions) -> FlowResult<()> {
        self.io.configure(config)?;
        self.setup(options)
    }

    fn empty(
        name: impl Into<String>,
        config: OperationConfig,
        layout: Option<Box<dyn GroupLayout>>,
    ) -> FlowResult<Self> {
        Ok(Self {
            io: OperationIo::declare(name, config, PortStyle::Delegators)?,
            children: Children::new(),
            layout,
            metrics: MetricsRecorder::new(),
            logger: LogManager::new(),
        })
    }

    pub fn setup(&mut self, options: SetupOptions) -> FlowResult<()> {
        self.io.ensure_configured()?;
        if options.create {
            self.create()?;
        }
        if options.link {
            self.link()?;
        }
        Ok(())
    }

    /// Runs the layout's create phase.
    ///
    /// The group is no longer ready afterwards: its delegators still point at
    /// the previous children until `link` runs again.
    pub fn create(&mut self) -> FlowResult<()> {
        self.io.ensure_configured()?;
        self.io.mark_declared();
        let mut layout = self.layout.take();
        let result = match layout.as_mut() {
            Some(layout) => layout.create(&mut self.children),
            None => Ok(()),
        };
        self.layout = layout;
        result
    }

    /// Runs the layout's link phase and marks the group ready.
    pub fn link(&mut self) -> FlowResult<()> {
        let mut layout = self.layout.take();
        let result = match layout.as_mut() {
            Some(layout) => self.link_with(|linker| layout.link(linker)),
            None => self.link_with(|_| Ok(())),
        };
        self.layout = layout;
        result
    }

    /// Wires the children with an ad-hoc closure instead of a layout.
    pub fn link_with<F>(&mut self, wire: F) -> FlowResult<()>
    where
        F: FnOnce(&mut Linker<'_>) -> FlowResult<()>,
    {
        self.io.ensure_configured()?;
        let mut linker = Linker::new(&mut self.io, &self.children);
        wire(&mut linker)?;
        let links = linker.links();
        self.io.mark_ready();
        self.logger.linked(self.io.name(), self.children.len());
        self.logger.record(&format!(
            "group '{}' established {} links",
            self.io.name(),
            links
        ));
        Ok(())
    }

    pub fn add_child(&mut self, child: Box<dyn Operation>) -> FlowResult<()> {
        let name = child.name().to_string();
        if self.children.contains_key(&name) {
            return Err(FlowError::Configuration(format!(
                "group '{}' already has a child named '{}'",
                self.io.name(),
                name
            )));
        }
        self.children.insert(name, child);
        Ok(())
    }

    pub fn child(&self, name: &str) -> Option<&dyn Operation> {
        self.children.get(name).map(|child| child.as_ref())
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut (dyn Operation + 'static)> {
        self.children.get_mut(name).map(|child| child.as_mut())
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &dyn Operation)> {
        self.children
            .iter()
            .map(|(name, child)| (name, child.as_ref()))
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Executes every child once, in declaration order.
    ///
    /// Stops at the first failing child. Values already pushed by earlier
    /// children stay in their ports.
    pub fn execute_all(&mut self) -> FlowResult<()> {
        self.io.ensure_ready()?;
        for (name, child) in self.children.iter_mut() {
            if let Err(err) = child.execute() {
                self.metrics.record_error();
                self.logger.failed(self.io.name(), name, &err);
                return Err(err);
            }
            self.metrics.record_processed();
        }
        self.metrics.record_pass();
        Ok(())
    }
}

impl Operation for OperationGroup {
    fn io(&self) -> &OperationIo {
        &self.io
    }

    fn io_mut(&mut self) -> &mut OperationIo {
        &mut self.io
    }

    /// Puts `inputs` into the group's ports, runs the children and reads the
    /// declared outputs back in the shape of the dispatch strategy.
    fn evaluate(&mut self, inputs: ValueMap) -> FlowResult<Outcome> {
        self.io.inputs().put_all(inputs)?;
        self.execute_all()?;
        let values = self.io.outputs().get_items(self.io.output_names())?;
        Ok(match self.io.strategy() {
            DispatchStrategy::None => Outcome::Nothing,
            DispatchStrategy::One => Outcome::One(values.into_iter().next().unwrap_or_default()),
            DispatchStrategy::Many => Outcome::Many(values),
            DispatchStrategy::Mapping => Outcome::Mapping(self.io.output_as_map(values)),
        })
    }

    fn execute(&mut self) -> FlowResult<()> {
        self.execute_all()
    }

    fn describe(&self) -> OperationMap {
        let children = self.children.values().map(|child| child.describe()).collect();
        self.io.describe(children)
    }
}
