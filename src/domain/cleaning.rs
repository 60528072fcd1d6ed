//! Value-level cleaning of vendor cells: numeric coercion, categorical text,
//! and the dividend-yield scale convention.

use std::fmt;
use std::str::FromStr;

/// Sentinel for missing or blank categorical values.
pub const UNCLASSIFIED: &str = "Non classifié";

/// Default substituted for any missing or unparsable continuous measure.
pub const NUMERIC_DEFAULT: f64 = 0.0;

/// Scale in which a source reports dividend yields.
///
/// Prepared tables are always percent-scaled (3.2 means 3.2%). Each source
/// declares its own scale; values are never inspected to guess it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YieldScale {
    #[default]
    Percent,
    Fraction,
}

impl YieldScale {
    pub fn to_percent(self, value: f64) -> f64 {
        match self {
            YieldScale::Percent => value,
            YieldScale::Fraction => value * 100.0,
        }
    }
}

impl FromStr for YieldScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "percent" | "pct" | "%" => Ok(YieldScale::Percent),
            "fraction" | "ratio" => Ok(YieldScale::Fraction),
            other => Err(format!("unknown dividend yield scale '{other}'")),
        }
    }
}

impl fmt::Display for YieldScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YieldScale::Percent => write!(f, "percent"),
            YieldScale::Fraction => write!(f, "fraction"),
        }
    }
}

/// Parses a dirty numeric cell. Returns `None` when nothing finite survives.
///
/// Decimal commas become dots, then every character other than an ASCII
/// digit, `.` or `-` is dropped before parsing.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let stripped: String = raw
        .replace(',', ".")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    stripped.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn coerce_numeric(raw: Option<&str>, default: f64) -> f64 {
    raw.and_then(parse_numeric).unwrap_or(default)
}

pub fn coerce_optional(raw: Option<&str>) -> Option<f64> {
    raw.and_then(parse_numeric)
}

pub fn clean_categorical(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return UNCLASSIFIED.to_string();
    };
    let kept: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        UNCLASSIFIED.to_string()
    } else {
        collapsed
    }
}

/// Full names keep their punctuation; only surrounding whitespace goes.
pub fn clean_full_name(raw: Option<&str>, ticker: &str) -> String {
    match raw.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => ticker.trim().to_string(),
    }
}

/// Optional text cell: trimmed, `None` when blank.
pub fn clean_code(raw: Option<&str>) -> Option<String> {
    raw.map(|s| s.trim().to_uppercase()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_plain_number() {
        assert_eq!(coerce_numeric(Some("12.5"), 0.0), 12.5);
        assert_eq!(coerce_numeric(Some("-3"), 0.0), -3.0);
    }

    #[test]
    fn coerce_decimal_comma() {
        assert_eq!(coerce_numeric(Some("1,5"), 0.0), 1.5);
    }

    #[test]
    fn coerce_strips_symbols() {
        assert_eq!(coerce_numeric(Some(" 3.2 %"), 0.0), 3.2);
        assert_eq!(coerce_numeric(Some("€ 250"), 0.0), 250.0);
    }

    #[test]
    fn coerce_defaults_on_garbage() {
        assert_eq!(coerce_numeric(Some("N/A"), 0.0), 0.0);
        assert_eq!(coerce_numeric(Some(""), 0.0), 0.0);
        assert_eq!(coerce_numeric(None, 7.0), 7.0);
        assert_eq!(coerce_numeric(Some("1.2.3"), 0.0), 0.0);
        assert_eq!(coerce_numeric(Some("--"), 0.0), 0.0);
    }

    #[test]
    fn coerce_rejects_non_finite() {
        assert_eq!(coerce_numeric(Some("inf"), 0.0), 0.0);
        assert_eq!(coerce_numeric(Some("-inf"), 0.0), 0.0);
        assert_eq!(coerce_numeric(Some("NaN"), 0.0), 0.0);
        let huge = format!("1{}", "0".repeat(400));
        assert_eq!(coerce_numeric(Some(&huge), 0.0), 0.0);
    }

    #[test]
    fn thousands_separator_comma_is_read_as_decimal() {
        // "1,000" is read as 1.000 under the decimal-comma rule.
        assert_eq!(coerce_numeric(Some("1,000"), 0.0), 1.0);
    }

    #[test]
    fn optional_keeps_absence() {
        assert_eq!(coerce_optional(None), None);
        assert_eq!(coerce_optional(Some("n/a")), None);
        assert_eq!(coerce_optional(Some("1,1")), Some(1.1));
    }

    #[test]
    fn categorical_missing_becomes_sentinel() {
        assert_eq!(clean_categorical(None), UNCLASSIFIED);
        assert_eq!(clean_categorical(Some("   ")), UNCLASSIFIED);
        assert_eq!(clean_categorical(Some("--")), UNCLASSIFIED);
    }

    #[test]
    fn categorical_strips_punctuation_and_collapses_spaces() {
        assert_eq!(
            clean_categorical(Some("  Consumer   Cyclical. ")),
            "Consumer Cyclical"
        );
        assert_eq!(
            clean_categorical(Some("Banks - Diversified")),
            "Banks Diversified"
        );
        assert_eq!(clean_categorical(Some("Médical & Santé")), "Médical Santé");
    }

    #[test]
    fn full_name_falls_back_to_ticker() {
        assert_eq!(clean_full_name(None, "MC.PA"), "MC.PA");
        assert_eq!(clean_full_name(Some("  "), "MC.PA"), "MC.PA");
        assert_eq!(clean_full_name(Some(" LVMH S.A. "), "MC.PA"), "LVMH S.A.");
    }

    #[test]
    fn yield_scale_conversion() {
        assert_eq!(YieldScale::Percent.to_percent(3.2), 3.2);
        assert!((YieldScale::Fraction.to_percent(0.032) - 3.2).abs() < 1e-12);
    }

    #[test]
    fn yield_scale_parses() {
        assert_eq!("fraction".parse::<YieldScale>(), Ok(YieldScale::Fraction));
        assert_eq!(" Percent ".parse::<YieldScale>(), Ok(YieldScale::Percent));
        assert!("basis".parse::<YieldScale>().is_err());
    }
}
