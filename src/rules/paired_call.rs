//! Open/close balance checks (`SET ROLE` / `RESET ROLE` and the like).
//!
//! This is a counting heuristic. It flags files with more opens than closes
//! but cannot prove that every open is paired with a guaranteed close, for
//! example one inside a `finally` block.

use super::{missing_target, CompiledPattern, Evaluation, Rule, RuleMeta, TextPattern};
use crate::corpus::{SourceCorpus, TargetSelector};
use crate::types::Location;

pub struct PairedCallRule {
    meta: RuleMeta,
    target: TargetSelector,
    open: CompiledPattern,
    close: CompiledPattern,
}

impl PairedCallRule {
    pub fn new(
        meta: RuleMeta,
        target: &str,
        open: &TextPattern,
        close: &TextPattern,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            meta,
            target: TargetSelector::new(target)?,
            open: open.compile()?,
            close: close.compile()?,
        })
    }
}

impl Rule for PairedCallRule {
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

            let opens = self.open.lines_in(&file);
            let first = match opens.first() {
                Some(line) => *line,
                None => continue,
            };

            let closes = self.close.count_in(&file);
            if opens.len() > closes {
                eval.push(self.meta.violation(
                    format!(
                        "{} {:?} but only {} {:?}",
                        opens.len(),
                        self.open.as_str(),
                        closes,
                        self.close.as_str()
                    ),
                    vec![Location::line(file.path(), first)],
                ));
            }
        }

        Ok(eval)
    }
}
