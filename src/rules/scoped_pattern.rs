//! Patterns forbidden inside specific functions.

use serde::{Deserialize, Serialize};

use super::{
    compile_all_canonical, missing_target, parse_failure, CompiledPattern, Evaluation, Rule, RuleMeta,
    TextPattern,
};
use crate::analysis;
use crate::corpus::{SourceCorpus, TargetSelector};
use crate::types::Location;

/// Which functions a scoped rule looks inside.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMatcher {
    /// Bare function names to match exactly.
    #[serde(default)]
    pub names: Vec<String>,
    /// Also match `__init__`, `__new__` and `__post_init__`.
    #[serde(default)]
    pub initializers: bool,
}

impl FunctionMatcher {
    pub fn matches(&self, name: &str) -> bool {
        (self.initializers && analysis::is_initializer_name(name))
            || self.names.iter().any(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        !self.initializers && self.names.is_empty()
    }
}

/// Forbidden patterns searched only within the canonical body of matched
/// functions, so the same text elsewhere in the file is ignored.
///
/// One violation per (function, pattern), located at the `def` line.
pub struct ScopedPatternRule {
    meta: RuleMeta,
    target: TargetSelector,
    functions: FunctionMatcher,
    forbidden: Vec<CompiledPattern>,
}

impl ScopedPatternRule {
    pub fn new(
        meta: RuleMeta,
        target: &str,
        functions: FunctionMatcher,
        forbidden: &[TextPattern],
    ) -> anyhow::Result<Self> {
        Ok(Self {
            meta,
            target: TargetSelector::new(target)?,
            functions,
            forbidden: compile_all_canonical(forbidden)?,
        })
    }
}

impl Rule for ScopedPatternRule {
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

            for function in analysis::functions(&file, |name| self.functions.matches(name))? {
                for pattern in &self.forbidden {
                    if !pattern.is_match(&function.body) {
                        continue;
                    }
                    eval.push(self.meta.violation(
                        format!("{:?} in {}", pattern.as_str(), function.qualified_name),
                        vec![Location::line(file.path(), function.span.start_line)],
                    ));
                }
            }
        }

        Ok(eval)
    }
}
