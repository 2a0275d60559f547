//! Upstream sale record
//!
//! The marketplace feed is loose about numeric fields: the same field can
//! arrive as a JSON number in one event and as a numeric string in the next
//! (`"wear": 0.0245` vs `"wear": "0.0245"`). Decoding goes through
//! [`RawSale`], which accepts either shape, and is then validated into a
//! [`Sale`] whose numeric fields are guaranteed finite.
//!
//! Keys the engine does not interpret (tags, images, prices in other
//! currencies, ...) are kept verbatim in [`Sale::extra`] so clients get the
//! sale back as the marketplace sent it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::SaleError;
use crate::ids::SaleId;

/// A single marketplace sale as retained by the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSale", rename_all = "camelCase")]
pub struct Sale {
    /// Opaque upstream identifier.
    pub sale_id: SaleId,
    /// Item class (weapon type, or a cosmetic class such as "Sticker").
    pub category: String,
    /// Display name of the item.
    pub market_name: String,
    /// Pattern / paint seed index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<i64>,
    /// Float wear value, nominally within [0, 1].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wear: Option<f64>,
    /// Condition grade ("Factory New", "Field-Tested", ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exterior: Option<String>,
    /// Listing price in minor currency units (cents).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<u64>,
    /// Upstream keys passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Sale {
    /// Decode and validate a sale from an arbitrary JSON value.
    pub fn from_value(value: Value) -> Result<Self, SaleError> {
        if !value.is_object() {
            return Err(SaleError::Malformed {
                reason: format!("expected object, got {}", json_kind(&value)),
            });
        }
        let raw: RawSale = serde_json::from_value(value).map_err(|e| SaleError::Malformed {
            reason: e.to_string(),
        })?;
        Sale::try_from(raw)
    }

    /// Whether `wear` is present and inside the nominal [0, 1] range.
    ///
    /// Out-of-range wear is retained but never satisfies a wear bound.
    pub fn wear_in_range(&self) -> Option<f64> {
        self.wear.filter(|w| (0.0..=1.0).contains(w))
    }
}

/// Lenient wire shape of an upstream sale.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSale {
    #[serde(default)]
    sale_id: Option<Value>,
    #[serde(default)]
    category: Option<Value>,
    #[serde(default)]
    market_name: Option<Value>,
    #[serde(default)]
    pattern: Option<Value>,
    #[serde(default)]
    wear: Option<Value>,
    #[serde(default)]
    exterior: Option<Value>,
    #[serde(default)]
    sale_price: Option<Value>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl TryFrom<RawSale> for Sale {
    type Error = SaleError;

    fn try_from(raw: RawSale) -> Result<Self, Self::Error> {
        let mut extra = raw.extra;

        // Some feeds call the identifier plain `id`.
        let id_value = match raw.sale_id {
            Some(v) if !v.is_null() => v,
            _ => extra
                .remove("id")
                .filter(|v| !v.is_null())
                .ok_or(SaleError::missing("saleId"))?,
        };
        let sale_id: SaleId =
            serde_json::from_value(id_value.clone()).map_err(|_| SaleError::Malformed {
                reason: format!("unusable saleId {}", id_value),
            })?;
        if !sale_id.is_valid() {
            return Err(SaleError::missing("saleId"));
        }

        let category = required_string("category", raw.category)?;
        let market_name = required_string("marketName", raw.market_name)?;
        // A mistyped grade does not invalidate the listing; it is passed
        // through untouched and treated as absent.
        let exterior = match raw.exterior {
            Some(Value::String(s)) => Some(s),
            None | Some(Value::Null) => None,
            Some(other) => {
                extra.insert("exterior".to_string(), other);
                None
            }
        };

        let pattern = decode_integer("pattern", raw.pattern)?;
        let wear = decode_float("wear", raw.wear)?;
        let sale_price = match decode_integer("salePrice", raw.sale_price)? {
            Some(p) if p < 0 => return Err(SaleError::invalid_number("salePrice", p)),
            Some(p) => Some(p as u64),
            None => None,
        };

        Ok(Sale {
            sale_id,
            category,
            market_name,
            pattern,
            wear,
            exterior,
            sale_price,
            extra,
        })
    }
}

fn required_string(field: &'static str, value: Option<Value>) -> Result<String, SaleError> {
    optional_string(field, value)?.ok_or(SaleError::missing(field))
}

fn optional_string(field: &'static str, value: Option<Value>) -> Result<Option<String>, SaleError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(SaleError::Malformed {
            reason: format!("{} must be a string, got {}", field, json_kind(&other)),
        }),
    }
}

/// Decode a float that may be sent as a number or a numeric string.
///
/// Blank strings count as absent. Non-finite values are rejected.
pub fn decode_float(field: &'static str, value: Option<Value>) -> Result<Option<f64>, SaleError> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let t = s.trim();
            if t.is_empty() {
                return Ok(None);
            }
            t.parse::<f64>().ok()
        }
        Some(other) => return Err(SaleError::invalid_number(field, other)),
    };
    match parsed {
        Some(f) if f.is_finite() => Ok(Some(f)),
        _ => Err(SaleError::Malformed {
            reason: format!("{} is not a finite number", field),
        }),
    }
}

/// Decode an integer that may be sent as a number or a numeric string.
///
/// Integral floats (`231.0`) are accepted; fractional ones are not.
pub fn decode_integer(field: &'static str, value: Option<Value>) -> Result<Option<i64>, SaleError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Ok(Some(i)),
            None => integral(field, n.as_f64()).map(Some),
        },
        Some(Value::String(s)) => {
            let t = s.trim();
            if t.is_empty() {
                return Ok(None);
            }
            match t.parse::<i64>() {
                Ok(i) => Ok(Some(i)),
                Err(_) => integral(field, t.parse::<f64>().ok()).map(Some),
            }
        }
        Some(other) => Err(SaleError::invalid_number(field, other)),
    }
}

fn integral(field: &'static str, value: Option<f64>) -> Result<i64, SaleError> {
    match value {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        Some(f) => Err(SaleError::invalid_number(field, f)),
        None => Err(SaleError::Malformed {
            reason: format!("{} is not an integer", field),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}


// ── Property-Based Tests ────────────────────────────────────────────

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    proptest! {
        #[test]
        fn prop_wear_string_and_number_agree(wear in 0.0f64..=1.0) {
            let as_number = Sale::from_value(json!({
                "saleId": 1, "category": "Knife", "marketName": "B", "wear": wear
            })).unwrap();
            let as_string = Sale::from_value(json!({
                "saleId": 1, "category": "Knife", "marketName": "B", "wear": wear.to_string()
            })).unwrap();
            prop_assert_eq!(as_number.wear, as_string.wear);
        }

        #[test]
        fn prop_pattern_string_and_number_agree(pattern in 0i64..1000) {
            let sale = Sale::from_value(json!({
                "saleId": 1, "category": "Knife", "marketName": "B", "pattern": pattern.to_string()
            })).unwrap();
            prop_assert_eq!(sale.pattern, Some(pattern));
        }
    }
}
