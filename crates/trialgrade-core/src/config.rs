//! Scoring configuration loaded from TOML.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{GradeError, Result};
use crate::normalize::{NormalizeOptions, DEFAULT_DIGEST_CAP};
use crate::recovery::DEFAULT_EXCERPT_CHARS;

/// Raw agent LLM identifier and its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelLabel {
    pub llm: String,
    pub label: String,
}

impl ModelLabel {
    pub fn new(llm: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            llm: llm.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Domain display and iteration order.
    pub domains: Vec<String>,
    pub digest_cap: usize,
    pub excerpt_chars: usize,
    /// Models to score, in ranking input order. Empty means every model found.
    pub models: Vec<ModelLabel>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            domains: vec![
                "retail".to_string(),
                "airline".to_string(),
                "telecom".to_string(),
            ],
            digest_cap: DEFAULT_DIGEST_CAP,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            models: Vec::new(),
        }
    }
}

impl ScoringConfig {
    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.digest_cap == 0 {
            return Err(GradeError::InvalidConfig(
                "digest_cap must be at least 1".to_string(),
            ));
        }
        let mut llms = HashSet::new();
        let mut labels = HashSet::new();
        for m in &self.models {
            if m.llm.trim().is_empty() || m.label.trim().is_empty() {
                return Err(GradeError::InvalidConfig(
                    "model entries need a non-empty llm and label".to_string(),
                ));
            }
            if !llms.insert(m.llm.as_str()) {
                return Err(GradeError::InvalidConfig(format!(
                    "duplicate model llm: {}",
                    m.llm
                )));
            }
            if !labels.insert(m.label.as_str()) {
                return Err(GradeError::InvalidConfig(format!(
                    "duplicate model label: {}",
                    m.label
                )));
            }
        }
        Ok(())
    }

    /// Restrict scoring to a single LLM. An LLM absent from the mapping is
    /// scored under its raw name.
    pub fn with_model_filter(mut self, llm: &str) -> Self {
        let label = self
            .label_for(llm)
            .map(str::to_string)
            .unwrap_or_else(|| llm.to_string());
        self.models = vec![ModelLabel::new(llm, label)];
        self
    }

    /// Display label for a raw LLM string. `None` means the model is not
    /// scored; with an empty mapping every LLM maps to itself.
    pub fn label_for<'a>(&'a self, llm: &'a str) -> Option<&'a str> {
        if self.models.is_empty() {
            return Some(llm);
        }
        self.models
            .iter()
            .find(|m| m.llm == llm)
            .map(|m| m.label.as_str())
    }

    /// Configured labels in ranking input order.
    pub fn labels(&self) -> Vec<String> {
        self.models.iter().map(|m| m.label.clone()).collect()
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            digest_cap: self.digest_cap,
            excerpt_chars: self.excerpt_chars,
        }
    }
}
