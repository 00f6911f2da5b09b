//! Rule registry and driver.
//!
//! The engine runs every registered rule against one corpus. Each rule runs
//! inside its own isolation boundary: an `Err` or a panic becomes a single
//! `RuleError` annotation on the report and the remaining rules still run.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::config::RuleFile;
use crate::corpus::SourceCorpus;
use crate::error::EngineError;
use crate::report::{Report, RuleError, RuleSkip};
use crate::rules::{self, Evaluation, Rule, SkipReason};

/// Shared flag that stops rules from starting once set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Callback invoked with a rule id each time a rule finishes or is skipped.
pub type RuleDoneCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Options for a single run.
#[derive(Clone)]
pub struct RunOptions {
    /// Rules not started before this much time has passed are skipped.
    pub timeout: Option<Duration>,
    pub cancel: CancelToken,
    /// Evaluate rules on the rayon pool. Sequential when false.
    pub parallel: bool,
    pub on_rule_done: Option<RuleDoneCallback>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            cancel: CancelToken::new(),
            parallel: true,
            on_rule_done: None,
        }
    }
}

impl RunOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn on_rule_done<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_rule_done = Some(Arc::new(callback));
        self
    }
}

/// What one worker hands back for merging.
enum Outcome {
    Evaluated(Evaluation),
    Skipped(SkipReason),
    Failed(String),
}

/// Registry of immutable rules.
#[derive(Default)]
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
    ids: HashSet<String>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every rule declared in a rule file.
    pub fn from_config(file: &RuleFile) -> anyhow::Result<Self> {
        let mut engine = Self::new();
        for rule in rules::build_all(file)? {
            engine.register(rule)?;
        }
        Ok(engine)
    }

    /// Register a rule. Ids must be unique.
    pub fn register(&mut self, rule: Box<dyn Rule>) -> Result<(), EngineError> {
        if !self.ids.insert(rule.id().to_string()) {
            return Err(EngineError::DuplicateRule(rule.id().to_string()));
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule with default options.
    pub fn run(&self, corpus: &SourceCorpus) -> Report {
        self.run_with(corpus, &RunOptions::default())
    }

    /// Run every rule, then merge and sort the results.
    pub fn run_with(&self, corpus: &SourceCorpus, options: &RunOptions) -> Report {
        let deadline = options.timeout.map(|t| Instant::now() + t);
        let started = Instant::now();

        let evaluate = |rule: &Box<dyn Rule>| {
            let outcome = run_one(rule.as_ref(), corpus, options, deadline);
            if let Some(callback) = &options.on_rule_done {
                callback(rule.id());
            }
            (rule.id().to_string(), outcome)
        };

        let outcomes: Vec<(String, Outcome)> = if options.parallel {
            self.rules.par_iter().map(evaluate).collect()
        } else {
            self.rules.iter().map(evaluate).collect()
        };

        let mut report = Report::new(self.rules.len());
        for (rule_id, outcome) in outcomes {
            match outcome {
                Outcome::Evaluated(eval) => {
                    report.violations.extend(eval.violations);
                    report.skips.extend(eval.skips.into_iter().map(|reason| RuleSkip {
                        rule_id: rule_id.clone(),
                        reason,
                    }));
                }
                Outcome::Skipped(reason) => report.skips.push(RuleSkip { rule_id, reason }),
                Outcome::Failed(error) => report.errors.push(RuleError { rule_id, error }),
            }
        }
        report.sort();

        tracing::debug!(
            rules = self.rules.len(),
            violations = report.violations.len(),
            skips = report.skips.len(),
            errors = report.errors.len(),
            files_loaded = corpus.loaded_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "run complete"
        );
        report
    }
}

fn run_one(
    rule: &dyn Rule,
    corpus: &SourceCorpus,
    options: &RunOptions,
    deadline: Option<Instant>,
) -> Outcome {
    if options.cancel.is_cancelled() {
        tracing::debug!(rule = rule.id(), "cancelled before start");
        return Outcome::Skipped(SkipReason::Cancelled);
    }
    if deadline.is_some_and(|d| Instant::now() >= d) {
        tracing::warn!(rule = rule.id(), "deadline passed before start");
        return Outcome::Skipped(SkipReason::Timeout);
    }

    tracing::debug!(rule = rule.id(), "evaluating");
    let result = panic::catch_unwind(AssertUnwindSafe(|| rule.evaluate(corpus)));

    match result {
        Ok(Ok(eval)) => {
            tracing::debug!(
                rule = rule.id(),
                violations = eval.violations.len(),
                skips = eval.skips.len(),
                "evaluated"
            );
            Outcome::Evaluated(eval)
        }
        Ok(Err(e)) => {
            tracing::warn!(rule = rule.id(), error = %format!("{:#}", e), "rule failed");
            Outcome::Failed(format!("{:#}", e))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(rule = rule.id(), panic = %message, "rule panicked");
            Outcome::Failed(format!("panicked: {}", message))
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
