//! Explicit registry of report constructors, keyed by report name.

use super::{DiffReport, PerformanceReport, Report, ReportError, ReportOptions};
use std::collections::BTreeMap;
use tracing::debug;

/// Constructor plus metadata for one report type.
#[derive(Clone, Copy)]
pub struct ReportDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub build: fn(&ReportOptions) -> Box<dyn Report>,
}

impl std::fmt::Debug for ReportDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Report types available to a run. Built once at startup and passed down.
#[derive(Debug, Clone, Default)]
pub struct ReportRegistry {
    entries: BTreeMap<&'static str, ReportDescriptor>,
}

impl ReportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The report types shipped with the comparator.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ReportDescriptor {
            name: DiffReport::NAME,
            description: DiffReport::DESCRIPTION,
            build: |options| Box::new(DiffReport::new(options)),
        });
        registry.register(ReportDescriptor {
            name: PerformanceReport::NAME,
            description: PerformanceReport::DESCRIPTION,
            build: |options| Box::new(PerformanceReport::new(options)),
        });
        debug!(reports = ?registry.names().collect::<Vec<_>>(), "report registry built");
        registry
    }

    /// Add or replace a report type.
    pub fn register(&mut self, descriptor: ReportDescriptor) {
        self.entries.insert(descriptor.name, descriptor);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Report names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ReportDescriptor> {
        self.entries.values()
    }

    /// Instantiate a report by name.
    pub fn create(&self, name: &str, options: &ReportOptions) -> Result<Box<dyn Report>, ReportError> {
        let descriptor = self
            .entries
            .get(name)
            .ok_or_else(|| ReportError::UnknownReportType(name.to_string()))?;
        Ok((descriptor.build)(options))
    }
}
