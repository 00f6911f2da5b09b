//! Cross-file registration checks.

use serde::{Deserialize, Serialize};

use super::{missing_target, Evaluation, Rule, RuleMeta, SkipReason};
use crate::corpus::{SourceCorpus, TargetSelector};
use crate::types::Location;

fn default_template() -> String {
    "{name}".to_string()
}

/// How a source file's stem becomes the name looked up in the registry.
///
/// Applied in order: strip prefix, strip suffix, substitute into `template`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameTransform {
    #[serde(default)]
    pub strip_prefix: Option<String>,
    #[serde(default)]
    pub strip_suffix: Option<String>,
    /// Must contain `{name}`.
    #[serde(default = "default_template")]
    pub template: String,
}

impl Default for NameTransform {
    fn default() -> Self {
        Self {
            strip_prefix: None,
            strip_suffix: None,
            template: default_template(),
        }
    }
}

impl NameTransform {
    pub fn apply(&self, stem: &str) -> String {
        let mut name = stem;
        if let Some(prefix) = &self.strip_prefix {
            name = name.strip_prefix(prefix.as_str()).unwrap_or(name);
        }
        if let Some(suffix) = &self.strip_suffix {
            name = name.strip_suffix(suffix.as_str()).unwrap_or(name);
        }
        self.template.replace("{name}", name)
    }
}

/// Every file under `sources` must be mentioned in the `registry` file.
///
/// Mention is a plain substring test of the transformed stem against the
/// registry's raw text.
pub struct RegistrationRule {
    meta: RuleMeta,
    sources: TargetSelector,
    registry: String,
    transform: NameTransform,
}

impl RegistrationRule {
    pub fn new(
        meta: RuleMeta,
        sources: &str,
        registry: &str,
        transform: NameTransform,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            meta,
            sources: TargetSelector::new(sources)?,
            registry: registry.trim_start_matches("./").to_string(),
            transform,
        })
    }
}

impl Rule for RegistrationRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, corpus: &SourceCorpus) -> anyhow::Result<Evaluation> {
        if let Some(skip) = missing_target(corpus, &self.sources) {
            return Ok(Evaluation::skipped(skip));
        }

        let registry = match corpus.file(&self.registry)? {
            Some(file) => file,
            None => {
                return Ok(Evaluation::skipped(SkipReason::MissingTarget(format!(
                    "registry file {} not found",
                    self.registry
                ))))
            }
        };

        let mut eval = Evaluation::new();
        for file in corpus.files(&self.sources) {
            let file = file?;
            if file.path() == self.registry {
                continue;
            }

            let name = self.transform.apply(file.stem());
            if !registry.text().contains(&name) {
                eval.push(self.meta.violation(
                    format!("{} is not registered in {}", name, self.registry),
                    vec![Location::file(file.path()), Location::file(&self.registry)],
                ));
            }
        }

        Ok(eval)
    }
}
