pub mod fft;
pub mod stats;

pub use fft::FftHelper;
pub use stats::{RunningStats, StatsHelper};
