use log::{debug, error, info};

/// Operation-aware wrapper over the `log` facade.
#[derive(Debug, Clone, Copy)]
pub struct LogManager;

impl LogManager {
    pub fn new() -> Self {
        Self
    }

    pub fn record(&self, message: &str) {
        info!("{}", message);
    }

    pub fn executed(&self, operation: &str, strategy: &str) {
        debug!("operation '{}' executed ({} dispatch)", operation, strategy);
    }

    pub fn failed(&self, group: &str, child: &str, err: &dyn std::error::Error) {
        error!("group '{}' stopped at child '{}': {}", group, child, err);
    }

    pub fn linked(&self, group: &str, children: usize) {
        info!("group '{}' linked {} child operations", group, children);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}
