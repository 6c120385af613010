// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI defaults loaded from environment variables.

use column_qa_features::{DEFAULT_STRUCTURAL_TYPES, FEATURE_COUNT};

/// Extraction defaults; command-line flags override them.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Structural types to extract (comma-separated `COLUMN_QA_TYPES`).
    pub types: Vec<String>,
    /// Classifier input width for `vector` output.
    pub feature_width: usize,
    /// Measure elements on all cores.
    pub parallel: bool,
    /// Refuse models without a declared length unit.
    pub strict_units: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| {
            var(key)
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false)
        };

        Self {
            types: var("COLUMN_QA_TYPES")
                .map(|v| parse_types(&v))
                .filter(|types| !types.is_empty())
                .unwrap_or_else(|| DEFAULT_STRUCTURAL_TYPES.iter().map(|t| t.to_string()).collect()),
            feature_width: var("COLUMN_QA_FEATURE_WIDTH")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(FEATURE_COUNT),
            parallel: flag("COLUMN_QA_PARALLEL"),
            strict_units: flag("COLUMN_QA_STRICT_UNITS"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Split a comma-separated type list, dropping blanks
pub fn parse_types(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
