use crate::generator::noise::NoiseSource;
use crate::generator::profile::build_signal;
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use log::info;
use ndarray::ArrayD;
use sigflow::operation::{Children, GroupLayout, Linker, OperationGroup, OperationMap};
use sigflow::processing::{
    ArrayStreamer, Comparison, IsEqual, LineLength, RunningMean, Spectrum, Sum,
};
use sigflow::{FlowError, FlowResult, Operation, OperationConfig, Outcome, Value, ValueMap};

/// Noise block broadcast to two summing leaves whose sums are gathered and
/// compared.
struct ComparisonLayout {
    shape: (usize, usize),
    noise: f64,
    seed: u64,
}

impl GroupLayout for ComparisonLayout {
    fn create(&mut self, children: &mut Children) -> FlowResult<()> {
        let source = NoiseSource::operation("noise", self.shape, self.noise, self.seed)?;
        children.insert("noise", source.boxed());
        children.insert("left", Sum::operation("left")?.boxed());
        children.insert("right", Sum::operation("right")?.boxed());
        children.insert("agree", IsEqual::operation("agree", Comparison::All)?.boxed());
        Ok(())
    }

    fn link(&mut self, linker: &mut Linker<'_>) -> FlowResult<()> {
        linker.broadcast("noise", "data", &[("left", "data"), ("right", "data")])?;
        linker.gather(&[("left", "sum"), ("right", "sum")], "agree", "data")?;
        linker.expose_output("agree", "agree", "result")?;
        linker.expose_output("min", "left", "min")?;
        linker.expose_output("max", "right", "max")
    }
}

/// Row chunks of a signal through line length, then fanned out to a running
/// mean and a spectrum.
struct StreamingLayout {
    signal: Option<ArrayD<f64>>,
    chunk_rows: usize,
    squared: bool,
}

impl GroupLayout for StreamingLayout {
    fn create(&mut self, children: &mut Children) -> FlowResult<()> {
        let signal = self.signal.take().ok_or_else(|| {
            FlowError::Configuration("streaming signal was already consumed".into())
        })?;
        let streamer = ArrayStreamer::operation("stream", signal, self.chunk_rows)?;
        children.insert("stream", streamer.boxed());
        children.insert(
            "line_length",
            LineLength::operation("line_length", self.squared)?.boxed(),
        );
        children.insert("mean", RunningMean::operation("mean")?.boxed());
        children.insert("spectrum", Spectrum::operation("spectrum", None)?.boxed());
        Ok(())
    }

    fn link(&mut self, linker: &mut Linker<'_>) -> FlowResult<()> {
        linker.connect("stream", "data", "line_length", "data")?;
        linker.broadcast(
            "line_length",
            "line_length",
            &[("mean", "data"), ("spectrum", "data")],
        )?;
        linker.expose_output("mean", "mean", "mean")?;
        linker.expose_output("spectrum", "spectrum", "magnitudes")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonSummary {
    pub passes: usize,
    pub agreements: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamingSummary {
    pub chunks: usize,
    pub mean: Option<f64>,
    pub peak_magnitude: f64,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn comparison_group(&self) -> anyhow::Result<OperationGroup> {
        let layout = ComparisonLayout {
            shape: (self.config.rows.max(1), self.config.columns.max(1)),
            noise: self.config.noise,
            seed: self.config.seed,
        };
        OperationGroup::new(
            "comparison",
            OperationConfig::new(Vec::<String>::new(), ["agree", "min", "max"]),
            layout,
        )
        .context("building comparison pipeline")
    }

    pub fn streaming_group(&self) -> anyhow::Result<OperationGroup> {
        let signal = build_signal(&self.config.to_signal_config())?;
        let layout = StreamingLayout {
            signal: Some(signal.into_dyn()),
            chunk_rows: self.config.chunk_rows,
            squared: self.config.squared_line_length,
        };
        OperationGroup::new(
            "streaming",
            OperationConfig::new(Vec::<String>::new(), ["mean", "spectrum"]),
            layout,
        )
        .context("building streaming pipeline")
    }

    /// Evaluates the comparison pipeline `passes` times.
    pub fn run_comparison(&self) -> anyhow::Result<ComparisonSummary> {
        let mut group = self.comparison_group()?;
        let mut summary = ComparisonSummary {
            passes: 0,
            agreements: 0,
            min: None,
            max: None,
        };

        for pass in 0..self.config.passes {
            let outcome = group
                .evaluate(ValueMap::new())
                .with_context(|| format!("comparison pass {}", pass))?;
            let values = match outcome {
                Outcome::Many(values) => values,
                other => anyhow::bail!("comparison pipeline returned {}", other.shape_name()),
            };
            if values[0].as_bool() == Some(true) {
                summary.agreements += 1;
            }
            if let Some(min) = values[1].as_float() {
                summary.min = Some(summary.min.map_or(min, |m| m.min(min)));
            }
            if let Some(max) = values[2].as_float() {
                summary.max = Some(summary.max.map_or(max, |m| m.max(max)));
            }
        }
        summary.passes = group.metrics().passes();
        info!(
            "comparison pipeline finished {} passes ({} agreed)",
            summary.passes, summary.agreements
        );
        Ok(summary)
    }

    /// Drives the streaming pipeline until its source is exhausted.
    pub fn run_streaming(&self) -> anyhow::Result<StreamingSummary> {
        let mut group = self.streaming_group()?;
        let mut summary = StreamingSummary {
            chunks: 0,
            mean: None,
            peak_magnitude: 0.0,
        };

        loop {
            group
                .execute()
                .with_context(|| format!("streaming chunk {}", summary.chunks))?;
            let outputs = group.outputs().get_items(["mean", "spectrum"])?;
            let spectrum = match &outputs[1] {
                Value::Empty => break,
                value => value.as_array(),
            };
            if let Some(mean) = outputs[0].as_float() {
                summary.mean = Some(mean);
            }
            if let Some(spectrum) = spectrum {
                summary.peak_magnitude = spectrum
                    .iter()
                    .fold(summary.peak_magnitude, |peak, &m| peak.max(m));
            }
            summary.chunks += 1;
        }
        info!("streaming pipeline drained after {} chunks", summary.chunks);
        Ok(summary)
    }

    /// Wiring of both pipelines, for `--dump-ports`.
    pub fn describe(&self) -> anyhow::Result<Vec<OperationMap>> {
        Ok(vec![
            self.comparison_group()?.describe(),
            self.streaming_group()?.describe(),
        ])
    }
}
