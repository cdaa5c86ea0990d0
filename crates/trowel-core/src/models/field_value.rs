//! Typed field values
//!
//! Resources carry a closed set of value kinds. Geometry, georeference and
//! category-specific extension values that have no dedicated kind are kept as
//! raw JSON so they survive round-trips untouched.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    /// Date range, years relative to the common era
    Dating { begin: Option<i64>, end: Option<i64> },
    /// Measured value, optionally a range up to `range_max`
    Dimension {
        value: f64,
        range_max: Option<f64>,
        unit: String,
    },
    Json(serde_json::Value),
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b).is_eq(),
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (
                Self::Dating { begin, end },
                Self::Dating {
                    begin: other_begin,
                    end: other_end,
                },
            ) => begin == other_begin && end == other_end,
            (
                Self::Dimension {
                    value,
                    range_max,
                    unit,
                },
                Self::Dimension {
                    value: other_value,
                    range_max: other_range_max,
                    unit: other_unit,
                },
            ) => {
                value.total_cmp(other_value).is_eq()
                    && match (range_max, other_range_max) {
                        (Some(a), Some(b)) => a.total_cmp(b).is_eq(),
                        (None, None) => true,
                        _ => false,
                    }
                    && unit == other_unit
            }
            (Self::Json(a), Self::Json(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        assert_eq!(FieldValue::text("A"), FieldValue::from("A"));
        assert_ne!(FieldValue::text("A"), FieldValue::text("B"));
        assert_eq!(FieldValue::Number(f64::NAN), FieldValue::Number(f64::NAN));
        assert_ne!(FieldValue::Number(1.0), FieldValue::text("1"));
        assert_eq!(
            FieldValue::Json(serde_json::json!({"type": "Point", "coordinates": [1, 2]})),
            FieldValue::Json(serde_json::json!({"coordinates": [1, 2], "type": "Point"}))
        );
    }

    #[test]
    fn test_kind_tag_serialization() {
        let value = FieldValue::Dimension {
            value: 12.5,
            range_max: None,
            unit: "cm".to_string(),
        };
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["kind"], "dimension");
        assert_eq!(json["value"]["unit"], "cm");

        let parsed: FieldValue = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, value);
    }
}
