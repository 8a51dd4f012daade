//! Sequential batch execution with per-invoice failure isolation

use crate::matcher::MatchedInvoice;
use crate::scenario::{Scenario, ScenarioResult};
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

/// Progress hooks called around each invoice
pub trait BatchObserver {
    fn started(&mut self, _invoice: &MatchedInvoice) {}
    fn finished(&mut self, _invoice: &MatchedInvoice, _result: &ScenarioResult) {}
}

/// Observer that ignores all progress
pub struct Silent;

impl BatchObserver for Silent {}

/// An invoice whose scenario failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub number: u64,
    pub folder: PathBuf,
    pub cause: String,
}

/// Aggregated outcome of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub scenario: Scenario,
    /// Invoice folders selected
    pub matched: usize,
    /// Invoices whose scenario succeeded
    pub processed: usize,
    /// Files removed across all invoices (deletion scenario)
    pub deleted: usize,
    pub failures: Vec<Failure>,
}

impl BatchSummary {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            matched: 0,
            processed: 0,
            deleted: 0,
            failures: Vec::new(),
        }
    }

    /// Fold one invoice outcome into the summary
    pub fn record(&mut self, invoice: &MatchedInvoice, result: &ScenarioResult) {
        self.matched += 1;
        match result {
            ScenarioResult::Success { count } => {
                self.processed += 1;
                self.deleted += count.unwrap_or(0);
            }
            ScenarioResult::Failure { cause } => self.failures.push(Failure {
                number: invoice.number,
                folder: invoice.folder.clone(),
                cause: cause.clone(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs a scenario over matched invoices, one at a time
pub struct BatchRunner {
    scenario: Scenario,
}

impl BatchRunner {
    pub fn new(scenario: Scenario) -> Self {
        Self { scenario }
    }

    /// Process invoices in ascending number order.
    ///
    /// A failing invoice is recorded and the batch moves on to the next one.
    pub fn run<F>(
        &self,
        mut invoices: Vec<MatchedInvoice>,
        observer: &mut dyn BatchObserver,
        mut processor: F,
    ) -> BatchSummary
    where
        F: FnMut(&MatchedInvoice) -> ScenarioResult,
    {
        invoices.sort();
        let mut summary = BatchSummary::new(self.scenario);

        for invoice in &invoices {
            observer.started(invoice);
            let result = processor(invoice);

            if let ScenarioResult::Failure { cause } = &result {
                warn!(number = invoice.number, folder = %invoice.folder.display(), %cause, "invoice failed");
            }

            observer.finished(invoice, &result);
            summary.record(invoice, &result);
        }

        summary
    }
}
