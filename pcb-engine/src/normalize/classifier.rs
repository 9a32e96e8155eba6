//! Metric family classification
//!
//! Long-format rows name their family in free text (`variable`), and wide
//! rows sometimes use idiosyncratic column names. Both are classified by
//! ordered rule tables: the first matching rule wins, because the cue
//! substrings overlap ("TCC per Work RVU" contains "work rvu").

use crate::models::{MetricFamily, Percentile};

/// Median above which a "work RVU" labelled value is taken as wRVU volume
///
/// Smaller values under a wRVU label are conversion factors mislabeled by the
/// source survey.
pub const WRVU_MAGNITUDE_THRESHOLD: f64 = 1000.0;

/// Text test applied to a lower-cased label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Equals(&'static str),
    Contains(&'static str),
}

impl Cue {
    pub fn matches(self, text: &str) -> bool {
        match self {
            Cue::Equals(s) => text == s,
            Cue::Contains(s) => text.contains(s),
        }
    }
}

/// Outcome of a matching rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Family(MetricFamily),
    /// Work RVU label: ratio cues mean CF, otherwise decided by magnitude
    WorkRvu,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    pub cues: &'static [Cue],
    pub verdict: Verdict,
}

impl ClassificationRule {
    fn matches(&self, text: &str) -> bool {
        self.cues.iter().any(|cue| cue.matches(text))
    }
}

/// Ordered rules for long-format `variable` text
pub const VARIABLE_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        cues: &[Cue::Contains("tcc per work rvu"), Cue::Contains("conversion factor")],
        verdict: Verdict::Family(MetricFamily::Cf),
    },
    ClassificationRule {
        cues: &[
            Cue::Equals("tcc"),
            Cue::Contains("total cash compensation"),
            Cue::Contains("total compensation"),
            Cue::Contains("cash compensation"),
            Cue::Contains("total comp"),
        ],
        verdict: Verdict::Family(MetricFamily::Tcc),
    },
    ClassificationRule {
        cues: &[Cue::Contains("work rvu"), Cue::Contains("wrvu")],
        verdict: Verdict::WorkRvu,
    },
    ClassificationRule {
        cues: &[Cue::Contains("cf"), Cue::Contains("conversion")],
        verdict: Verdict::Family(MetricFamily::Cf),
    },
];

/// Cues inside a work RVU label that mark a disguised ratio
const RATIO_CUES: &[Cue] = &[Cue::Contains("per"), Cue::Contains("conversion")];

/// Ordered rules for wide-format column names found by the secondary scan
pub const COLUMN_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        cues: &[
            Cue::Contains("tcc per"),
            Cue::Contains("per wrvu"),
            Cue::Contains("per work rvu"),
            Cue::Contains("cf"),
            Cue::Contains("conversion"),
            Cue::Contains("factor"),
        ],
        verdict: Verdict::Family(MetricFamily::Cf),
    },
    ClassificationRule {
        cues: &[Cue::Contains("wrvu"), Cue::Contains("rvu"), Cue::Contains("work")],
        verdict: Verdict::Family(MetricFamily::Wrvu),
    },
    ClassificationRule {
        cues: &[Cue::Contains("tcc"), Cue::Contains("cash"), Cue::Contains("compensation")],
        verdict: Verdict::Family(MetricFamily::Tcc),
    },
];

/// Classify long-format variable text
///
/// `p50` is only consulted for bare work RVU labels. Returns `None` when no
/// rule matches (the row then carries no family).
pub fn classify_variable(variable: &str, p50: f64) -> Option<MetricFamily> {
    let text = variable.trim().to_lowercase();
    let rule = VARIABLE_RULES.iter().find(|rule| rule.matches(&text))?;

    match rule.verdict {
        Verdict::Family(family) => Some(family),
        Verdict::WorkRvu => {
            if RATIO_CUES.iter().any(|cue| cue.matches(&text)) {
                Some(MetricFamily::Cf)
            } else {
                Some(family_by_magnitude(p50))
            }
        }
    }
}

/// Magnitude heuristic for work RVU labels
///
/// TODO: replace with an explicit unit tag once data stores carry one; the
/// threshold is a guess that misfiles very low-volume specialties.
pub fn family_by_magnitude(p50: f64) -> MetricFamily {
    if p50 > WRVU_MAGNITUDE_THRESHOLD {
        MetricFamily::Wrvu
    } else {
        MetricFamily::Cf
    }
}

/// Classify a wide-format column name into (family, percentile)
///
/// Both a family cue and a percentile cue must be present.
pub fn classify_column(column: &str) -> Option<(MetricFamily, Percentile)> {
    let text = column.trim().to_lowercase();
    let percentile = percentile_cue(&text)?;
    let family = COLUMN_RULES.iter().find_map(|rule| match rule.verdict {
        Verdict::Family(family) if rule.matches(&text) => Some(family),
        _ => None,
    })?;
    Some((family, percentile))
}

/// Percentile named by a whole token: `median`, `50`, `50th` or `p50`
fn percentile_cue(text: &str) -> Option<Percentile> {
    let tokens: Vec<&str> = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect();
    if tokens.contains(&"median") {
        return Some(Percentile::P50);
    }
    Percentile::ALL.into_iter().find(|p| {
        let rank = p.rank();
        tokens.iter().any(|token| {
            *token == rank
                || token.strip_suffix("th") == Some(rank)
                || token.strip_prefix('p') == Some(rank)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcc_per_work_rvu_is_cf() {
        assert_eq!(classify_variable("TCC per Work RVU", 55.0), Some(MetricFamily::Cf));
        assert_eq!(classify_variable("TCC per Work RVU", 9000.0), Some(MetricFamily::Cf));
    }

    #[test]
    fn test_tcc_labels() {
        for label in [
            "TCC",
            "Total Cash Compensation",
            "Total Compensation (excl. benefits)",
            "Cash Compensation",
            "Total Comp",
        ] {
            assert_eq!(classify_variable(label, 300000.0), Some(MetricFamily::Tcc), "{}", label);
        }
    }

    #[test]
    fn test_work_rvu_magnitude_heuristic() {
        assert_eq!(classify_variable("Work RVUs", 800.0), Some(MetricFamily::Cf));
        assert_eq!(classify_variable("Work RVUs", 5000.0), Some(MetricFamily::Wrvu));
        assert_eq!(classify_variable("wRVU", 1000.0), Some(MetricFamily::Cf));
        assert_eq!(classify_variable("wRVU", 1000.01), Some(MetricFamily::Wrvu));
    }

    #[test]
    fn test_work_rvu_ratio_cues() {
        assert_eq!(classify_variable("Compensation per wRVU", 60.0), Some(MetricFamily::Cf));
        assert_eq!(classify_variable("wRVU conversion", 9000.0), Some(MetricFamily::Cf));
    }

    #[test]
    fn test_generic_cf_labels() {
        assert_eq!(classify_variable("CF", 52.0), Some(MetricFamily::Cf));
        assert_eq!(classify_variable("Conversion Factor", 52.0), Some(MetricFamily::Cf));
    }

    #[test]
    fn test_unknown_variable_has_no_family() {
        assert_eq!(classify_variable("Call Pay Daily Rate", 1500.0), None);
        assert_eq!(classify_variable("", 1500.0), None);
    }

    #[test]
    fn test_rule_order_is_first_match() {
        // "total compensation per work rvu" hits the TCC rule before the
        // work RVU rule; only the explicit CF phrases outrank TCC.
        assert_eq!(
            classify_variable("Total Compensation per Work RVU", 60.0),
            Some(MetricFamily::Tcc)
        );
    }

    #[test]
    fn test_classify_column_names() {
        assert_eq!(
            classify_column("Work RVUs 50th %ile"),
            Some((MetricFamily::Wrvu, Percentile::P50))
        );
        assert_eq!(
            classify_column("Comp per wRVU (90)"),
            Some((MetricFamily::Cf, Percentile::P90))
        );
        assert_eq!(
            classify_column("Total Cash Median"),
            Some((MetricFamily::Tcc, Percentile::P50))
        );
        assert_eq!(classify_column("Conversion Factor 25"), Some((MetricFamily::Cf, Percentile::P25)));
    }

    #[test]
    fn test_year_in_column_name_is_not_a_percentile() {
        assert_eq!(
            classify_column("TCC 2025 Survey 90th"),
            Some((MetricFamily::Tcc, Percentile::P90))
        );
        assert_eq!(classify_column("TCC 2025 Survey"), None);
        assert_eq!(classify_column("TCC_p75"), Some((MetricFamily::Tcc, Percentile::P75)));
    }

    #[test]
    fn test_classify_column_requires_both_cues() {
        assert_eq!(classify_column("Work RVUs"), None);
        assert_eq!(classify_column("Bonus 75"), None);
    }
}
