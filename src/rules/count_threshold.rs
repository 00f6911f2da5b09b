//! Minimum file counts per named group (test files per workflow, etc).

use super::{Evaluation, Rule, RuleMeta, SkipReason};
use crate::corpus::{SourceCorpus, TargetSelector};
use crate::types::Location;

/// Default share of groups allowed under the minimum.
pub const DEFAULT_MAX_UNDER_FRACTION: f64 = 0.5;

/// How many groups may fall below the minimum before the rule fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tolerance {
    /// At most this many groups.
    Count(usize),
    /// At most this fraction of all groups.
    Fraction(f64),
}

impl Tolerance {
    /// `max_under` wins over `max_under_fraction` when both are given.
    pub fn from_config(max_under: Option<usize>, max_under_fraction: Option<f64>) -> Self {
        match (max_under, max_under_fraction) {
            (Some(count), _) => Tolerance::Count(count),
            (None, Some(fraction)) => Tolerance::Fraction(fraction),
            (None, None) => Tolerance::Fraction(DEFAULT_MAX_UNDER_FRACTION),
        }
    }

    pub fn is_exceeded(&self, under: usize, total: usize) -> bool {
        match *self {
            Tolerance::Count(max) => under > max,
            Tolerance::Fraction(max) => under as f64 > max * total as f64,
        }
    }
}

struct Group {
    name: String,
    selector: TargetSelector,
}

/// For each group, counts corpus paths matching `template` with `{group}`
/// substituted, and reports the groups below `min_count` together.
pub struct CountThresholdRule {
    meta: RuleMeta,
    template: String,
    groups: Vec<Group>,
    min_count: usize,
    tolerance: Tolerance,
}

impl CountThresholdRule {
    pub fn new(
        meta: RuleMeta,
        groups: &[String],
        template: &str,
        min_count: usize,
        tolerance: Tolerance,
    ) -> anyhow::Result<Self> {
        if !template.contains("{group}") {
            anyhow::bail!("template {:?} has no {{group}} placeholder", template);
        }

        let groups = groups
            .iter()
            .map(|name| {
                Ok(Group {
                    name: name.clone(),
                    selector: TargetSelector::new(&template.replace("{group}", name))?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            meta,
            template: template.to_string(),
            groups,
            min_count,
            tolerance,
        })
    }
}

impl Rule for CountThresholdRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, corpus: &SourceCorpus) -> anyhow::Result<Evaluation> {
        let any_present = self
            .groups
            .iter()
            .any(|g| corpus.has_dir(g.selector.base_dir()));
        if !any_present {
            return Ok(Evaluation::skipped(SkipReason::MissingTarget(format!(
                "no directory found for {}",
                self.template
            ))));
        }

        let mut under = Vec::new();
        let mut locations: Vec<Location> = Vec::new();
        for group in &self.groups {
            let count = corpus.matching_paths(&group.selector).len();
            if count >= self.min_count {
                continue;
            }
            under.push(format!("{} ({})", group.name, count));

            let base = group.selector.base_dir();
            if !base.is_empty() && !locations.iter().any(|l| l.path == base) {
                locations.push(Location::file(base));
            }
        }

        let mut eval = Evaluation::new();
        if self.tolerance.is_exceeded(under.len(), self.groups.len()) {
            eval.push(self.meta.violation(
                format!(
                    "{} of {} groups have fewer than {} files matching {}: {}",
                    under.len(),
                    self.groups.len(),
                    self.min_count,
                    self.template,
                    under.join(", ")
                ),
                locations,
            ));
        }
        Ok(eval)
    }
}
