//! Rule declarations for lawcheck.
//!
//! A rule file names each check, cites the law it enforces, and carries the
//! patterns and parameters the check needs. Nothing about a check is
//! hardcoded: adding a pattern is a change to this file, not to the code.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rules::{FunctionMatcher, NameTransform, TextPattern};
use crate::types::Severity;

/// Starter rule file written by `lawcheck init`.
pub const STARTER_TEMPLATE: &str = include_str!("templates/starter.yaml");

/// Top-level rule file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RuleFile {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Layer ordering, expanded into import-boundary rules.
    #[serde(default)]
    pub layers: Option<LayerTable>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl RuleFile {
    /// Parse a rule file from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_str(&content)
    }

    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Declared rules followed by the rules expanded from the layer table.
    pub fn all_rules(&self) -> Vec<RuleSpec> {
        let mut rules = self.rules.clone();
        if let Some(layers) = &self.layers {
            rules.extend(layers.expand());
        }
        rules
    }
}

/// One declared rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleSpec {
    pub id: String,
    /// Citation of the governing document, e.g. `SESSION-AND-TENANT-LAW.md §Rule 4`.
    pub law: String,
    /// Stable finding id, e.g. `SEC-002`.
    pub finding: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: Severity,
    pub fix: String,
    pub check: CheckSpec,
}

/// Parameters of each rule variant.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckSpec {
    ImportBoundary {
        target: String,
        /// Module prefix; matches the module itself and anything below it.
        forbidden_import: String,
    },
    PairedCall {
        target: String,
        open: TextPattern,
        close: TextPattern,
    },
    Registration {
        sources: String,
        /// Corpus-relative path of the file that must mention each source.
        registry: String,
        #[serde(default)]
        transform: NameTransform,
    },
    ScopedPattern {
        target: String,
        functions: FunctionMatcher,
        forbidden: Vec<TextPattern>,
    },
    RatioThreshold {
        target: String,
        superset: TextPattern,
        subset: TextPattern,
        min_ratio: f64,
    },
    CountThreshold {
        groups: Vec<String>,
        /// Glob with a `{group}` placeholder.
        template: String,
        min_count: usize,
        #[serde(default)]
        max_under: Option<usize>,
        #[serde(default)]
        max_under_fraction: Option<f64>,
    },
}

impl CheckSpec {
    pub fn type_name(&self) -> &'static str {
        match self {
            CheckSpec::ImportBoundary { .. } => "import_boundary",
            CheckSpec::PairedCall { .. } => "paired_call",
            CheckSpec::Registration { .. } => "registration",
            CheckSpec::ScopedPattern { .. } => "scoped_pattern",
            CheckSpec::RatioThreshold { .. } => "ratio_threshold",
            CheckSpec::CountThreshold { .. } => "count_threshold",
        }
    }
}

/// Layer ordering, outermost layer first.
///
/// A layer may not import any layer listed before it. Each forbidden pair
/// becomes an import-boundary rule with id `{id_prefix}-{inner}-{outer}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LayerTable {
    pub id_prefix: String,
    pub law: String,
    pub finding: String,
    pub fix: String,
    #[serde(default)]
    pub severity: Severity,
    pub order: Vec<Layer>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Layer {
    pub name: String,
    /// Dotted module path of the layer's package.
    pub module: String,
    /// Glob selecting the layer's files.
    pub target: String,
}

impl LayerTable {
    pub fn expand(&self) -> Vec<RuleSpec> {
        let mut rules = Vec::new();
        for (i, inner) in self.order.iter().enumerate() {
            for outer in &self.order[..i] {
                rules.push(RuleSpec {
                    id: format!("{}-{}-{}", self.id_prefix, inner.name, outer.name),
                    law: self.law.clone(),
                    finding: self.finding.clone(),
                    description: format!("{} must not import {}", inner.name, outer.name),
                    severity: self.severity,
                    fix: self.fix.clone(),
                    check: CheckSpec::ImportBoundary {
                        target: inner.target.clone(),
                        forbidden_import: outer.module.clone(),
                    },
                });
            }
        }
        rules
    }
}

/// Validate a rule file before any rule is built.
pub fn validate(file: &RuleFile) -> Result<(), ConfigError> {
    if let Some(layers) = &file.layers {
        validate_layers(layers)?;
    }

    let mut seen = HashSet::new();
    for rule in file.all_rules() {
        if rule.id.trim().is_empty() {
            return Err(ConfigError::invalid("", "rule id must not be empty"));
        }
        if !seen.insert(rule.id.clone()) {
            return Err(ConfigError::invalid(&rule.id, "duplicate rule id"));
        }
        validate_rule(&rule)?;
    }

    Ok(())
}

fn validate_layers(layers: &LayerTable) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for layer in &layers.order {
        if layer.name.is_empty() || layer.module.is_empty() {
            return Err(ConfigError::invalid(
                &layers.id_prefix,
                "layer name and module must not be empty",
            ));
        }
        if !names.insert(layer.name.as_str()) {
            return Err(ConfigError::invalid(
                &layers.id_prefix,
                format!("duplicate layer {:?}", layer.name),
            ));
        }
    }
    Ok(())
}

fn validate_rule(rule: &RuleSpec) -> Result<(), ConfigError> {
    let id = rule.id.as_str();

    for (field, value) in [("law", &rule.law), ("finding", &rule.finding), ("fix", &rule.fix)] {
        if value.trim().is_empty() {
            return Err(ConfigError::invalid(id, format!("{} must not be empty", field)));
        }
    }

    match &rule.check {
        CheckSpec::ImportBoundary {
            target,
            forbidden_import,
        } => {
            check_glob(id, target)?;
            if forbidden_import.trim().is_empty() {
                return Err(ConfigError::invalid(id, "forbidden_import must not be empty"));
            }
        }
        CheckSpec::PairedCall {
            target,
            open,
            close,
        } => {
            check_glob(id, target)?;
            check_pattern(id, open)?;
            check_pattern(id, close)?;
        }
        CheckSpec::Registration {
            sources,
            registry,
            transform,
        } => {
            check_glob(id, sources)?;
            if registry.trim().is_empty() {
                return Err(ConfigError::invalid(id, "registry must not be empty"));
            }
            if !transform.template.contains("{name}") {
                return Err(ConfigError::invalid(
                    id,
                    format!("transform template {:?} has no {{name}}", transform.template),
                ));
            }
        }
        CheckSpec::ScopedPattern {
            target,
            functions,
            forbidden,
        } => {
            check_glob(id, target)?;
            if functions.is_empty() {
                return Err(ConfigError::invalid(id, "functions selects no function"));
            }
            if forbidden.is_empty() {
                return Err(ConfigError::invalid(id, "forbidden must list at least one pattern"));
            }
            for p in forbidden {
                check_pattern(id, p)?;
            }
        }
        CheckSpec::RatioThreshold {
            target,
            superset,
            subset,
            min_ratio,
        } => {
            check_glob(id, target)?;
            check_pattern(id, superset)?;
            check_pattern(id, subset)?;
            if !(0.0..=1.0).contains(min_ratio) {
                return Err(ConfigError::invalid(
                    id,
                    format!("min_ratio {} is outside [0, 1]", min_ratio),
                ));
            }
        }
        CheckSpec::CountThreshold {
            groups,
            template,
            max_under_fraction,
            ..
        } => {
            if groups.is_empty() {
                return Err(ConfigError::invalid(id, "groups must not be empty"));
            }
            if !template.contains("{group}") {
                return Err(ConfigError::invalid(
                    id,
                    format!("template {:?} has no {{group}}", template),
                ));
            }
            for group in groups {
                check_glob(id, &template.replace("{group}", group))?;
            }
            if let Some(fraction) = max_under_fraction {
                if !(0.0..=1.0).contains(fraction) {
                    return Err(ConfigError::invalid(
                        id,
                        format!("max_under_fraction {} is outside [0, 1]", fraction),
                    ));
                }
            }
        }
    }

    Ok(())
}

fn check_glob(id: &str, pattern: &str) -> Result<(), ConfigError> {
    globset::Glob::new(pattern)
        .map(|_| ())
        .map_err(|e| ConfigError::invalid(id, format!("invalid glob {:?}: {}", pattern, e)))
}

fn check_pattern(id: &str, pattern: &TextPattern) -> Result<(), ConfigError> {
    pattern
        .compile()
        .map(|_| ())
        .map_err(|e| ConfigError::invalid(id, format!("invalid pattern {:?}: {}", pattern.source(), e)))
}
