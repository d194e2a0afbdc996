//! Batch analysis: correlate two fully loaded captures, then compare.

use crate::compare::{Comparison, ComparisonRules};
use crate::correlate::{correlate, CorrelationOutcome};
use std::sync::Arc;
use tc_common::Pair;
use tracing::info;

/// Two captures with correlation already established.
#[derive(Debug)]
pub struct Analyzer {
    primary: Vec<Pair>,
    shadow: Vec<Pair>,
    outcome: CorrelationOutcome,
}

impl Analyzer {
    /// Correlate `primary` with `shadow`. Both streams stay in memory.
    pub fn new(mut primary: Vec<Pair>, mut shadow: Vec<Pair>) -> Self {
        info!(
            primary = primary.len(),
            shadow = shadow.len(),
            "correlating captures"
        );
        let outcome = correlate(&mut primary, &mut shadow);
        Self {
            primary,
            shadow,
            outcome,
        }
    }

    pub fn outcome(&self) -> CorrelationOutcome {
        self.outcome
    }

    pub fn primary(&self) -> &[Pair] {
        &self.primary
    }

    pub fn shadow(&self) -> &[Pair] {
        &self.shadow
    }

    /// One comparison per correlated primary, in primary order.
    pub fn analyze(&self, rules: &ComparisonRules) -> Vec<Comparison> {
        let comparisons: Vec<Comparison> = self
            .primary
            .iter()
            .filter_map(|p| {
                let shadow = self.shadow.get(p.correlation()?.index())?;
                Some(Comparison::new(
                    p.response().clone(),
                    shadow.response().clone(),
                    Some(Arc::clone(p.request_handle())),
                    rules,
                ))
            })
            .collect();
        info!(compared = comparisons.len(), "analysis complete");
        comparisons
    }

    /// Primary pairs that found no shadow counterpart.
    pub fn skipped(&self) -> impl Iterator<Item = &Pair> {
        self.primary.iter().filter(|p| !p.is_correlated())
    }
}
