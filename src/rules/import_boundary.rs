//! Forbidden-import checks between packages and layers.

use std::collections::BTreeSet;

use super::{missing_target, parse_failure, Evaluation, Rule, RuleMeta};
use crate::corpus::{SourceCorpus, TargetSelector};
use crate::types::Location;

/// Files under `target` must not import `forbidden` or any module below it.
///
/// Produces one violation per offending file, located at every offending
/// import line.
pub struct ImportBoundaryRule {
    meta: RuleMeta,
    target: TargetSelector,
    forbidden: String,
}

impl ImportBoundaryRule {
    pub fn new(meta: RuleMeta, target: &str, forbidden_import: &str) -> anyhow::Result<Self> {
        Ok(Self {
            meta,
            target: TargetSelector::new(target)?,
            forbidden: forbidden_import.to_string(),
        })
    }
}

impl Rule for ImportBoundaryRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, corpus: &SourceCorpus) -> anyhow::Result<Evaluation> {
        if let Some(skip) = missing_target(corpus, &self.target) {
            return Ok(Evaluation::skipped(skip));
        }

        let mut eval = Evaluation::new();
        for file in corpus.files(&self.target) {
            let file = file?;
            if !file.is_python() {
                continue;
            }
            if let Some(skip) = parse_failure(&file) {
                eval.skip(skip);
                continue;
            }

            let edges = file.import_edges();
            let offending: Vec<_> = edges
                .iter()
                .filter_map(|e| e.reached_under(&self.forbidden).map(|module| (module, e.line)))
                .collect();
            if offending.is_empty() {
                continue;
            }

            let modules: BTreeSet<&str> = offending.iter().map(|(m, _)| m.as_str()).collect();
            let mut locations: Vec<Location> = offending
                .iter()
                .map(|(_, line)| Location::line(file.path(), *line))
                .collect();
            locations.dedup();

            eval.push(self.meta.violation(
                format!(
                    "imports {} (forbidden: {})",
                    modules.into_iter().collect::<Vec<_>>().join(", "),
                    self.forbidden
                ),
                locations,
            ));
        }

        Ok(eval)
    }
}
