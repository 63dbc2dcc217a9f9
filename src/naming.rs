//! Naming conventions translate the human-chosen meter names and tag keys
//! into identifiers a backend will accept. The convention runs exactly once,
//! at registration time, and the result is cached on the registered meter;
//! nothing on the export path re-normalizes names.
//!
//! A degenerate input never fails here. The worst a hostile name can do is
//! come out ugly; metrics production must never abort application logic.

use crate::meter::MeterKind;

/// Maps raw names and tag keys to backend-legal identifiers. Implementations
/// must be pure: same inputs, same output, no side effects.
pub trait NamingConvention: Send + Sync + 'static {
    /// Normalize a meter name. `base_unit` is only consulted for kinds whose
    /// numeric semantics want a unit suffix.
    fn name(&self, raw: &str, kind: MeterKind, base_unit: Option<&str>) -> String;

    /// Normalize a tag key.
    fn tag_key(&self, raw: &str) -> String;
}

const NAME_PREFIX: &str = "m_";
const TIMER_SUFFIX: &str = "_duration_seconds";

/// The default convention, producing Prometheus-style snake_case identifiers:
/// dots become underscores, camelCase boundaries get an underscore, every
/// disallowed character becomes exactly one underscore, and names that do not
/// start with a letter are prefixed with a sentinel. Timers get a
/// `_duration_seconds` suffix and distribution summaries get their declared
/// base unit appended.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnakeCaseNaming;

impl SnakeCaseNaming {
    /// Snake-case then sanitize against an allow-list. Each disallowed
    /// character maps to exactly one underscore; runs are deliberately not
    /// collapsed so the output length tracks the input.
    fn sanitize(raw: &str, allow_colon: bool) -> String {
        let mut out = String::with_capacity(raw.len() + 2);
        let mut prev_lower = false;
        for c in raw.chars() {
            if c == '.' {
                out.push('_');
                prev_lower = false;
                continue;
            }
            if c.is_ascii_uppercase() {
                if prev_lower {
                    out.push('_');
                }
                out.push(c.to_ascii_lowercase());
                prev_lower = false;
                continue;
            }
            let legal = c.is_ascii_lowercase()
                || c.is_ascii_digit()
                || c == '_'
                || (allow_colon && c == ':');
            out.push(if legal { c } else { '_' });
            prev_lower = c.is_ascii_lowercase();
        }
        if !out.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
            out.insert_str(0, NAME_PREFIX);
        }
        out
    }
}

impl NamingConvention for SnakeCaseNaming {
    fn name(&self, raw: &str, kind: MeterKind, base_unit: Option<&str>) -> String {
        let mut name = Self::sanitize(raw, true);
        match kind {
            MeterKind::Timer => {
                if !name.ends_with(TIMER_SUFFIX) {
                    name.push_str(TIMER_SUFFIX);
                }
            }
            MeterKind::DistributionSummary => {
                if let Some(unit) = base_unit {
                    let suffix = format!("_{unit}");
                    if !name.ends_with(&suffix) {
                        name.push_str(&suffix);
                    }
                }
            }
            _ => {}
        }
        name
    }

    fn tag_key(&self, raw: &str) -> String {
        Self::sanitize(raw, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_name() {
        let convention = SnakeCaseNaming;
        assert_eq!(
            convention.name("123abc/{:id}水", MeterKind::Gauge, None),
            "m_123abc__:id__"
        );
    }

    #[test]
    fn format_tag_key() {
        let convention = SnakeCaseNaming;
        assert_eq!(convention.tag_key("123abc/{:id}水"), "m_123abc___id__");
    }

    #[test]
    fn units_are_appended_to_timers() {
        let convention = SnakeCaseNaming;
        assert_eq!(
            convention.name("timer", MeterKind::Timer, None),
            "timer_duration_seconds"
        );
        // Re-applying must not double the suffix.
        assert_eq!(
            convention.name("timer_duration_seconds", MeterKind::Timer, None),
            "timer_duration_seconds"
        );
    }

    #[test]
    fn units_are_appended_to_distribution_summaries() {
        let convention = SnakeCaseNaming;
        assert_eq!(
            convention.name("response.size", MeterKind::DistributionSummary, Some("bytes")),
            "response_size_bytes"
        );
        assert_eq!(
            convention.name("summary", MeterKind::DistributionSummary, None),
            "summary"
        );
    }

    #[test]
    fn dot_notation_is_converted_to_snake_case() {
        let convention = SnakeCaseNaming;
        assert_eq!(convention.name("gauge.size", MeterKind::Gauge, None), "gauge_size");
    }

    #[test]
    fn camel_case_is_converted_to_snake_case() {
        let convention = SnakeCaseNaming;
        assert_eq!(convention.name("gaugeSize", MeterKind::Gauge, None), "gauge_size");
        assert_eq!(convention.name("a.b.C", MeterKind::Gauge, None), "a_b_c");
    }

    #[test]
    fn empty_name_still_yields_a_legal_identifier() {
        let convention = SnakeCaseNaming;
        assert_eq!(convention.name("", MeterKind::Counter, None), "m_");
    }

    #[test]
    fn illegal_runs_are_not_collapsed() {
        let convention = SnakeCaseNaming;
        assert_eq!(convention.name("a//b", MeterKind::Counter, None), "a__b");
    }
}
