//! Proportion heuristics over file populations.

use super::{missing_target, CompiledPattern, Evaluation, Rule, RuleMeta, SkipReason, TextPattern};
use crate::corpus::{SourceCorpus, TargetSelector};
use crate::types::Location;

/// Of the files under `target` matching `superset`, at least `min_ratio`
/// must also match `subset`.
///
/// An empty superset is reported as `InsufficientData`, never as a pass or
/// a violation.
pub struct RatioThresholdRule {
    meta: RuleMeta,
    target: TargetSelector,
    superset: CompiledPattern,
    subset: CompiledPattern,
    min_ratio: f64,
}

impl RatioThresholdRule {
    pub fn new(
        meta: RuleMeta,
        target: &str,
        superset: &TextPattern,
        subset: &TextPattern,
        min_ratio: f64,
    ) -> anyhow::Result<Self> {
        if !(0.0..=1.0).contains(&min_ratio) {
            anyhow::bail!("min_ratio {} is outside [0, 1]", min_ratio);
        }
        Ok(Self {
            meta,
            target: TargetSelector::new(target)?,
            superset: superset.compile()?,
            subset: subset.compile()?,
            min_ratio,
        })
    }
}

impl Rule for RatioThresholdRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, corpus: &SourceCorpus) -> anyhow::Result<Evaluation> {
        if let Some(skip) = missing_target(corpus, &self.target) {
            return Ok(Evaluation::skipped(skip));
        }

        let mut total = 0usize;
        let mut covered = 0usize;
        let mut lacking = Vec::new();

        for file in corpus.files(&self.target) {
            let file = file?;
            if !self.superset.is_match(file.text()) {
                continue;
            }
            total += 1;
            if self.subset.is_match(file.text()) {
                covered += 1;
            } else {
                lacking.push(Location::file(file.path()));
            }
        }

        if total == 0 {
            return Ok(Evaluation::skipped(SkipReason::InsufficientData(format!(
                "no files under {} match {:?}",
                self.target.pattern(),
                self.superset.as_str()
            ))));
        }

        let ratio = covered as f64 / total as f64;
        tracing::debug!(rule = %self.meta.id, covered, total, ratio, "ratio computed");

        let mut eval = Evaluation::new();
        if ratio < self.min_ratio {
            eval.push(self.meta.violation(
                format!(
                    "{:.0}% of files matching {:?} also match {:?} ({} of {}, minimum {:.0}%)",
                    ratio * 100.0,
                    self.superset.as_str(),
                    self.subset.as_str(),
                    covered,
                    total,
                    self.min_ratio * 100.0
                ),
                lacking,
            ));
        }
        Ok(eval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::{meta, write};
    use tempfile::TempDir;

    fn rule(min_ratio: f64) -> RatioThresholdRule {
        RatioThresholdRule::new(
            meta("OPS-1"),
            "services/*.py",
            &TextPattern::literal("logger."),
            &TextPattern::literal("tenant_id"),
            min_ratio,
        )
        .unwrap()
    }

    #[test]
    fn test_low_ratio_is_one_violation() {
        let temp = TempDir::new().unwrap();
        for i in 0..7 {
            write(temp.path(), &format!("services/plain{}.py", i), "x = 1\n");
        }
        write(
            temp.path(),
            "services/a.py",
            "logger.info('x', extra={'tenant_id': t})\n",
        );
        write(temp.path(), "services/b.py", "logger.info('x')\n");
        write(temp.path(), "services/c.py", "logger.warning('y')\n");

        let eval = rule(0.5).evaluate(&SourceCorpus::new(temp.path())).unwrap();

        assert_eq!(eval.violations.len(), 1);
        let v = &eval.violations[0];
        assert!(v.message.starts_with("33%"));
        assert_eq!(
            v.locations,
            vec![
                Location::file("services/b.py"),
                Location::file("services/c.py")
            ]
        );
    }

    #[test]
    fn test_ratio_at_threshold_passes() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "services/a.py", "logger.info(tenant_id)\n");
        write(temp.path(), "services/b.py", "logger.info('x')\n");

        let eval = rule(0.5).evaluate(&SourceCorpus::new(temp.path())).unwrap();
        assert!(eval.violations.is_empty());
        assert!(eval.skips.is_empty());
    }

    #[test]
    fn test_empty_superset_is_insufficient_data() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "services/a.py", "print('no logging')\n");

        let eval = rule(0.5).evaluate(&SourceCorpus::new(temp.path())).unwrap();
        assert!(eval.violations.is_empty());
        assert!(matches!(&eval.skips[..], [SkipReason::InsufficientData(_)]));
    }

    #[test]
    fn test_min_ratio_out_of_range() {
        let err = RatioThresholdRule::new(
            meta("OPS-1"),
            "services/*.py",
            &TextPattern::literal("a"),
            &TextPattern::literal("b"),
            1.5,
        );
        assert!(err.is_err());
    }
}
