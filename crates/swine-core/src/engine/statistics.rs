use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::config::LemmaKind;

/// Counters accumulated across `check_sat` calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub assertions: u64,
    pub iterations: u64,
    pub lemmas: BTreeMap<LemmaKind, u64>,
    /// Exponentials whose candidate values had to be clamped into range.
    pub clamps: u64,
    pub non_constant_base: bool,
}

impl Statistics {
    pub fn record_lemma(&mut self, kind: LemmaKind) {
        *self.lemmas.entry(kind).or_default() += 1;
    }

    pub fn lemma_count(&self, kind: LemmaKind) -> u64 {
        self.lemmas.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_lemmas(&self) -> u64 {
        self.lemmas.values().sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        row(f, "assertions", &self.assertions)?;
        row(f, "iterations", &self.iterations)?;
        for kind in LemmaKind::ALL {
            row(f, &format!("{kind} lemmas"), &self.lemma_count(kind))?;
        }
        row(f, "clamped exponentials", &self.clamps)?;
        row(f, "non constant base", &self.non_constant_base)
    }
}

fn row(f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display) -> fmt::Result {
    writeln!(f, "{:<20} {}", format!("{label}:"), value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_aligns_values() {
        let mut stats = Statistics {
            assertions: 3,
            iterations: 7,
            ..Statistics::default()
        };
        stats.record_lemma(LemmaKind::Interpolation);
        stats.record_lemma(LemmaKind::Interpolation);
        let text = stats.to_string();
        assert!(text.starts_with("assertions:          3\niterations:          7\n"));
        assert!(text.contains("interpolation lemmas: 2\n"));
        assert!(text.contains("symmetry lemmas:     0\n"));
        assert_eq!(stats.total_lemmas(), 2);
    }

    #[test]
    fn json_uses_lowercase_kinds() {
        let mut stats = Statistics::default();
        stats.record_lemma(LemmaKind::Modulo);
        let json = stats.to_json().unwrap();
        assert!(json.contains("\"modulo\": 1"));
    }
}
