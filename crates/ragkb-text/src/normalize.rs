//! Query normalization applied before either search path runs.
//!
//! Lowercases, collapses whitespace and expands domain abbreviations on
//! word boundaries. In `Append` mode the abbreviation is kept and its
//! expansion follows it, so both forms are searchable.

use regex::{Captures, Regex};
use std::collections::HashMap;

use ragkb_core::config::{ExpansionMode, NormalizerSettings};
use ragkb_core::{Error, Result};

#[derive(Debug, Clone)]
pub struct QueryNormalizer {
    pattern: Option<Regex>,
    expansions: HashMap<String, String>,
    mode: ExpansionMode,
}

impl QueryNormalizer {
    pub fn new(settings: &NormalizerSettings) -> Result<Self> {
        let expansions: HashMap<String, String> = settings
            .abbreviations
            .iter()
            .filter(|(abbr, _)| !abbr.trim().is_empty())
            .map(|(abbr, expansion)| (abbr.trim().to_lowercase(), expansion.trim().to_lowercase()))
            .collect();

        // Longest first so the alternation never prefers a shorter abbreviation.
        let mut keys: Vec<&String> = expansions.keys().collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let pattern = if keys.is_empty() {
            None
        } else {
            let alternation = keys.iter().map(|k| regex::escape(k)).collect::<Vec<_>>().join("|");
            let re = Regex::new(&format!(r"\b(?:{alternation})\b"))
                .map_err(|e| Error::InvalidConfig(format!("abbreviation pattern: {e}")))?;
            Some(re)
        };
        Ok(Self { pattern, expansions, mode: settings.mode })
    }

    /// Whitespace-only input is returned unchanged.
    pub fn normalize(&self, raw_query: &str) -> String {
        let collapsed = raw_query.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return raw_query.to_string();
        }
        let lowered = collapsed.to_lowercase();
        let Some(pattern) = &self.pattern else { return lowered };

        // Single pass: an expansion is never re-scanned for further abbreviations.
        pattern
            .replace_all(&lowered, |caps: &Captures| {
                let abbr = &caps[0];
                match (self.expansions.get(abbr), self.mode) {
                    (Some(expansion), ExpansionMode::Append) => format!("{abbr} {expansion}"),
                    (Some(expansion), ExpansionMode::Replace) => expansion.clone(),
                    (None, _) => abbr.to_string(),
                }
            })
            .into_owned()
    }
}
