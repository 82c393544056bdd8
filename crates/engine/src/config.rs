/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on rebuild/recalculate/revalidate/refresh rounds per flush.
    pub max_flush_iterations: usize,
    /// Collect per-expression evaluation timings.
    pub profiling: bool,
    /// Log every element build decision at debug level.
    pub trace_builds: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_flush_iterations: 1024, profiling: false, trace_builds: false }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_max_flush_iterations(mut self, iterations: usize) -> Self {
        self.max_flush_iterations = iterations.max(1);
        self
    }

    #[must_use]
    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.profiling = enabled;
        self
    }

    #[must_use]
    pub fn with_trace_builds(mut self, enabled: bool) -> Self {
        self.trace_builds = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_iterations_clamp_to_one() {
        assert_eq!(EngineConfig::default().with_max_flush_iterations(0).max_flush_iterations, 1);
    }
}
