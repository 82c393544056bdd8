use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionProfile {
    pub source: String,
    pub calls: u64,
    pub total: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileReport {
    /// Sorted by descending total time.
    pub expressions: Vec<ExpressionProfile>,
    pub builds: u64,
    pub refreshes: u64,
    pub flushes: u64,
    pub flush_iterations: u64,
}

/// Engine counters. Build/refresh/flush counts are always kept; expression
/// timings only when enabled.
#[derive(Debug, Default)]
pub struct Profiler {
    enabled: bool,
    expressions: RefCell<FxHashMap<String, (u64, Duration)>>,
    builds: Cell<u64>,
    refreshes: Cell<u64>,
    flushes: Cell<u64>,
    flush_iterations: Cell<u64>,
}

impl Profiler {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, ..Self::default() }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn time<R>(&self, source: &str, f: impl FnOnce() -> R) -> R {
        if !self.enabled {
            return f();
        }
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        let mut map = self.expressions.borrow_mut();
        let entry = map.entry(source.to_string()).or_default();
        entry.0 += 1;
        entry.1 += elapsed;
        result
    }

    pub(crate) fn count_build(&self) {
        self.builds.set(self.builds.get() + 1);
    }
    pub(crate) fn count_refresh(&self) {
        self.refreshes.set(self.refreshes.get() + 1);
    }
    pub(crate) fn count_flush(&self) {
        self.flushes.set(self.flushes.get() + 1);
    }
    pub(crate) fn count_iteration(&self) {
        self.flush_iterations.set(self.flush_iterations.get() + 1);
    }

    pub fn builds(&self) -> u64 {
        self.builds.get()
    }
    pub fn refreshes(&self) -> u64 {
        self.refreshes.get()
    }
    pub fn flushes(&self) -> u64 {
        self.flushes.get()
    }
    pub fn flush_iterations(&self) -> u64 {
        self.flush_iterations.get()
    }

    pub fn report(&self) -> ProfileReport {
        let mut expressions: Vec<ExpressionProfile> = self
            .expressions
            .borrow()
            .iter()
            .map(|(source, (calls, total))| ExpressionProfile { source: source.clone(), calls: *calls, total: *total })
            .collect();
        expressions.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.source.cmp(&b.source)));
        ProfileReport {
            expressions,
            builds: self.builds(),
            refreshes: self.refreshes(),
            flushes: self.flushes(),
            flush_iterations: self.flush_iterations(),
        }
    }

    pub fn reset(&self) {
        self.expressions.borrow_mut().clear();
        self.builds.set(0);
        self.refreshes.set(0);
        self.flushes.set(0);
        self.flush_iterations.set(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_profiler_skips_timings_but_counts() {
        let p = Profiler::new(false);
        assert_eq!(p.time("1", || 5), 5);
        p.count_build();
        let report = p.report();
        assert!(report.expressions.is_empty());
        assert_eq!(report.builds, 1);
    }

    #[test]
    fn enabled_profiler_accumulates_calls() {
        let p = Profiler::new(true);
        p.time("a", || ());
        p.time("a", || ());
        p.time("b", || ());
        let report = p.report();
        let a = report.expressions.iter().find(|e| e.source == "a").unwrap();
        assert_eq!(a.calls, 2);
        assert_eq!(report.expressions.len(), 2);
    }
}
