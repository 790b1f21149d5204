//! Checks a candidate feature value against the feature's bound component type
//! and its limits.

use crate::layout::FeatureLayout;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use recloser_core::model::{ComponentKind, LimitKind};
use std::str::FromStr;
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("'{value}' is not a valid {kind} value")]
    NotANumber { value: String, kind: ComponentKind },

    #[error("{value} is below the minimum of {min}")]
    BelowMinimum { value: String, min: String },

    #[error("{value} is above the maximum of {max}")]
    AboveMaximum { value: String, max: String },

    #[error("{value} is not a multiple of step {step}")]
    OffStep { value: String, step: String },

    #[error("text has {len} character(s), minimum is {min}")]
    TooShort { len: usize, min: usize },

    #[error("text has {len} character(s), maximum is {max}")]
    TooLong { len: usize, max: usize },

    #[error("'{value}' does not match the {kind} format {expected}")]
    BadFormat {
        value: String,
        kind: ComponentKind,
        expected: &'static str,
    },

    #[error("'{0}' is not a boolean (expected true or false)")]
    NotBoolean(String),

    #[error("limit {key} has an unusable value '{value}'")]
    InvalidLimit { key: LimitKind, value: String },
}

/// Validate `value` for `feature`. Features without a binding, buttons and
/// unknown component types accept anything.
pub fn validate_value(feature: &FeatureLayout, value: &str) -> Result<(), ValueError> {
    let Some(kind) = feature.component_kind() else {
        return Ok(());
    };
    match kind {
        ComponentKind::Integer | ComponentKind::Spinner => check_integer(feature, kind, value),
        ComponentKind::Decimal => check_decimal(feature, value),
        ComponentKind::TextField | ComponentKind::ComboBox => check_text(feature, value),
        ComponentKind::Date => NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map(|_| ())
            .map_err(|_| bad_format(value, kind, DATE_FORMAT)),
        ComponentKind::Time => {
            if TIME_FORMATS
                .iter()
                .any(|fmt| NaiveTime::parse_from_str(value, fmt).is_ok())
            {
                Ok(())
            } else {
                Err(bad_format(value, kind, TIME_FORMATS[0]))
            }
        }
        ComponentKind::DateTime => NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT)
            .map(|_| ())
            .map_err(|_| bad_format(value, kind, DATE_TIME_FORMAT)),
        ComponentKind::CheckBox | ComponentKind::Toggle => match value {
            "true" | "false" => Ok(()),
            other => Err(ValueError::NotBoolean(other.to_string())),
        },
        ComponentKind::Button => Ok(()),
    }
}

/// Human-readable validation result; empty when the value is accepted.
pub fn validation_message(feature: &FeatureLayout, value: &str) -> String {
    match validate_value(feature, value) {
        Ok(()) => String::new(),
        Err(e) => e.to_string(),
    }
}

fn bad_format(value: &str, kind: ComponentKind, expected: &'static str) -> ValueError {
    ValueError::BadFormat {
        value: value.to_string(),
        kind,
        expected,
    }
}

fn parsed_limit<T: FromStr>(feature: &FeatureLayout, key: LimitKind) -> Result<Option<T>, ValueError> {
    match feature.limit(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ValueError::InvalidLimit {
                key,
                value: raw.to_string(),
            }),
    }
}

fn check_integer(feature: &FeatureLayout, kind: ComponentKind, value: &str) -> Result<(), ValueError> {
    let v: i64 = value.parse().map_err(|_| ValueError::NotANumber {
        value: value.to_string(),
        kind,
    })?;
    let min: Option<i64> = parsed_limit(feature, LimitKind::MinValue)?;
    let max: Option<i64> = parsed_limit(feature, LimitKind::MaxValue)?;
    let step: Option<i64> = parsed_limit(feature, LimitKind::Step)?;

    if let Some(min) = min
        && v < min
    {
        return Err(ValueError::BelowMinimum {
            value: value.to_string(),
            min: min.to_string(),
        });
    }
    if let Some(max) = max
        && v > max
    {
        return Err(ValueError::AboveMaximum {
            value: value.to_string(),
            max: max.to_string(),
        });
    }
    if let Some(step) = step {
        if step <= 0 {
            return Err(ValueError::InvalidLimit {
                key: LimitKind::Step,
                value: step.to_string(),
            });
        }
        let offset = i128::from(v) - i128::from(min.unwrap_or(0));
        if offset.rem_euclid(i128::from(step)) != 0 {
            return Err(ValueError::OffStep {
                value: value.to_string(),
                step: step.to_string(),
            });
        }
    }
    Ok(())
}

fn check_decimal(feature: &FeatureLayout, value: &str) -> Result<(), ValueError> {
    let v: f64 = value
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| ValueError::NotANumber {
            value: value.to_string(),
            kind: ComponentKind::Decimal,
        })?;
    let min: Option<f64> = parsed_limit(feature, LimitKind::MinValue)?;
    let max: Option<f64> = parsed_limit(feature, LimitKind::MaxValue)?;
    let step: Option<f64> = parsed_limit(feature, LimitKind::Step)?;

    if let Some(min) = min
        && v < min
    {
        return Err(ValueError::BelowMinimum {
            value: value.to_string(),
            min: min.to_string(),
        });
    }
    if let Some(max) = max
        && v > max
    {
        return Err(ValueError::AboveMaximum {
            value: value.to_string(),
            max: max.to_string(),
        });
    }
    if let Some(step) = step {
        if step.is_nan() || step <= 0.0 {
            return Err(ValueError::InvalidLimit {
                key: LimitKind::Step,
                value: step.to_string(),
            });
        }
        let ratio = (v - min.unwrap_or(0.0)) / step;
        // Rounding error in the ratio grows with its magnitude.
        let tolerance = f64::EPSILON * 16.0 * ratio.abs().max(1.0);
        if (ratio - ratio.round()).abs() > tolerance {
            return Err(ValueError::OffStep {
                value: value.to_string(),
                step: step.to_string(),
            });
        }
    }
    Ok(())
}

fn check_text(feature: &FeatureLayout, value: &str) -> Result<(), ValueError> {
    let len = value.chars().count();
    if let Some(min) = parsed_limit::<usize>(feature, LimitKind::MinChar)?
        && len < min
    {
        return Err(ValueError::TooShort { len, min });
    }
    if let Some(max) = parsed_limit::<usize>(feature, LimitKind::MaxChar)?
        && len > max
    {
        return Err(ValueError::TooLong { len, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recloser_core::model::LimitValue;

    fn make_feature(component: Option<&str>, limits: &[(&str, &str)]) -> FeatureLayout {
        FeatureLayout {
            feature_id: 1,
            feature_key: "FEAT".into(),
            translations: Vec::new(),
            component_type: component.map(str::to_string),
            component_key: None,
            limits: limits
                .iter()
                .map(|(k, v)| LimitValue::new(*k, *v))
                .collect(),
        }
    }

    #[test]
    fn test_integer_range_and_step() {
        let f = make_feature(
            Some("Integer"),
            &[("MIN_VALUE", "0"), ("MAX_VALUE", "5000"), ("STEP", "5")],
        );
        assert!(validate_value(&f, "0").is_ok());
        assert!(validate_value(&f, "5000").is_ok());
        assert!(validate_value(&f, "25").is_ok());
        assert!(matches!(
            validate_value(&f, "-5"),
            Err(ValueError::BelowMinimum { .. })
        ));
        assert!(matches!(
            validate_value(&f, "5005"),
            Err(ValueError::AboveMaximum { .. })
        ));
        assert!(matches!(
            validate_value(&f, "12"),
            Err(ValueError::OffStep { .. })
        ));
        assert!(matches!(
            validate_value(&f, "1.5"),
            Err(ValueError::NotANumber { .. })
        ));
    }

    #[test]
    fn test_step_counts_from_minimum() {
        let f = make_feature(Some("Spinner"), &[("MIN_VALUE", "3"), ("STEP", "10")]);
        assert!(validate_value(&f, "13").is_ok());
        assert!(validate_value(&f, "10").is_err());
    }

    #[test]
    fn test_decimal_step() {
        let f = make_feature(Some("Decimal"), &[("MIN_VALUE", "0"), ("STEP", "0.1")]);
        assert!(validate_value(&f, "0.3").is_ok());
        assert!(validate_value(&f, "0.35").is_err());
        assert!(validate_value(&f, "NaN").is_err());
    }

    #[test]
    fn test_decimal_step_holds_for_large_values() {
        let f = make_feature(Some("Decimal"), &[("MIN_VALUE", "0"), ("STEP", "0.1")]);
        assert!(validate_value(&f, "123456789.1").is_ok());
        assert!(validate_value(&f, "99999.7").is_ok());
        assert!(validate_value(&f, "5000.1").is_ok());
        assert!(matches!(
            validate_value(&f, "123456789.15"),
            Err(ValueError::OffStep { .. })
        ));
    }

    #[test]
    fn test_text_length() {
        let f = make_feature(Some("TextField"), &[("MIN_CHAR", "2"), ("MAX_CHAR", "4")]);
        assert!(validate_value(&f, "ab").is_ok());
        assert!(validate_value(&f, "ção!").is_ok());
        assert_eq!(
            validate_value(&f, "a"),
            Err(ValueError::TooShort { len: 1, min: 2 })
        );
        assert_eq!(
            validate_value(&f, "abcde"),
            Err(ValueError::TooLong { len: 5, max: 4 })
        );
    }

    #[test]
    fn test_temporal_formats() {
        let date = make_feature(Some("Date"), &[]);
        assert!(validate_value(&date, "2024-02-29").is_ok());
        assert!(validate_value(&date, "2023-02-29").is_err());

        let time = make_feature(Some("Time"), &[]);
        assert!(validate_value(&time, "23:59:59").is_ok());
        assert!(validate_value(&time, "07:30").is_ok());
        assert!(validate_value(&time, "24:00").is_err());

        let dt = make_feature(Some("DateTime"), &[]);
        assert!(validate_value(&dt, "2024-01-31T12:00:00").is_ok());
        assert!(validate_value(&dt, "2024-01-31 12:00:00").is_err());
    }

    #[test]
    fn test_booleans_and_buttons() {
        let toggle = make_feature(Some("Toggle"), &[]);
        assert!(validate_value(&toggle, "true").is_ok());
        assert!(validate_value(&toggle, "yes").is_err());
        let button = make_feature(Some("Button"), &[]);
        assert!(validate_value(&button, "anything").is_ok());
        let unbound = make_feature(None, &[]);
        assert!(validate_value(&unbound, "anything").is_ok());
    }

    #[test]
    fn test_malformed_limit() {
        let f = make_feature(Some("Integer"), &[("MAX_VALUE", "lots")]);
        assert_eq!(
            validate_value(&f, "3"),
            Err(ValueError::InvalidLimit {
                key: LimitKind::MaxValue,
                value: "lots".into()
            })
        );
        assert!(!validation_message(&f, "3").is_empty());
        let ok = make_feature(Some("Integer"), &[]);
        assert_eq!(validation_message(&ok, "3"), "");
    }
}
