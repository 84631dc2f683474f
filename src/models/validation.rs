use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::str::FromStr;

pub const MAX_NAME_LENGTH: usize = 255;

/// Key used for errors that are not tied to one payload field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

const REQUIRED: &str = "This field is required.";

/// Whether an update must carry every required field (PUT) or only the changed ones (PATCH)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Full,
    Partial,
}

/// Field-level validation messages, keyed by payload field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(HashMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Records a message; the first message per field wins
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn into_map(self) -> HashMap<String, String> {
        self.0
    }

    /// Returns `value` when nothing was recorded, otherwise the collected errors
    pub fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields: Vec<_> = self.0.iter().collect();
        fields.sort();
        let joined = fields
            .into_iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{}", joined)
    }
}

pub fn as_object(payload: &Value) -> Result<&Map<String, Value>, FieldErrors> {
    payload
        .as_object()
        .ok_or_else(|| FieldErrors::single(NON_FIELD_ERRORS, "Expected a JSON object."))
}

/// Reads a required field; missing is only an error in full mode
pub fn check_required(
    map: &Map<String, Value>,
    field: &str,
    mode: UpdateMode,
    errors: &mut FieldErrors,
) -> bool {
    match map.get(field) {
        Some(Value::Null) => {
            errors.add(field, "This field may not be null.");
            false
        }
        Some(_) => true,
        None => {
            if mode == UpdateMode::Full {
                errors.add(field, REQUIRED);
            }
            false
        }
    }
}

pub fn parse_name(value: &Value, max_len: usize) -> Result<String, String> {
    let raw = value.as_str().ok_or_else(|| "Not a valid string.".to_string())?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("This field may not be blank.".to_string());
    }
    if trimmed.chars().count() > max_len {
        return Err(format!("Ensure this field has no more than {} characters.", max_len));
    }
    Ok(trimmed.to_string())
}

/// Optional free-text field; blank is allowed
pub fn parse_text(value: &Value, max_len: Option<usize>) -> Result<String, String> {
    let raw = match value {
        Value::Null => return Ok(String::new()),
        Value::String(s) => s.trim(),
        _ => return Err("Not a valid string.".to_string()),
    };
    if let Some(max_len) = max_len {
        if raw.chars().count() > max_len {
            return Err(format!("Ensure this field has no more than {} characters.", max_len));
        }
    }
    Ok(raw.to_string())
}

pub fn parse_non_negative_i32(value: &Value) -> Result<i32, String> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| "A valid integer is required.".to_string())?;

    if parsed < 0 {
        return Err("Ensure this value is greater than or equal to 0.".to_string());
    }
    i32::try_from(parsed).map_err(|_| format!("Ensure this value is less than or equal to {}.", i32::MAX))
}

/// Parses a NUMERIC(max_digits, decimal_places) value that must be >= 0.
/// Accepts JSON numbers and numeric strings; the result is rescaled to `decimal_places`.
pub fn parse_money(value: &Value, max_digits: u32, decimal_places: u32) -> Result<Decimal, String> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err("A valid number is required.".to_string()),
    };
    let mut decimal = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| "A valid number is required.".to_string())?;

    if decimal.is_sign_negative() && !decimal.is_zero() {
        return Err("Ensure this value is greater than or equal to 0.".to_string());
    }
    if decimal.normalize().scale() > decimal_places {
        return Err(format!(
            "Ensure that there are no more than {} decimal places.",
            decimal_places
        ));
    }
    let limit = Decimal::from(10u64.pow(max_digits - decimal_places));
    if decimal >= limit {
        return Err(format!("Ensure that there are no more than {} digits in total.", max_digits));
    }

    decimal.rescale(decimal_places);
    Ok(decimal.abs())
}

/// Parses `[{"name": ...}, ...]` into distinct names, keeping first-seen order
pub fn parse_name_list(value: &Value) -> Result<Vec<String>, String> {
    let items = value
        .as_array()
        .ok_or_else(|| "Expected a list of items.".to_string())?;

    let mut names: Vec<String> = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let name = item
            .as_object()
            .and_then(|obj| obj.get("name"))
            .ok_or_else(|| format!("Item {}: name is required.", index))
            .and_then(|name| {
                parse_name(name, MAX_NAME_LENGTH).map_err(|msg| format!("Item {}: {}", index, msg))
            })?;
        if !names.contains(&name) {
            names.push(name);
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn money_accepts_numbers_and_strings() {
        assert_eq!(parse_money(&json!(3.99), 5, 2).unwrap().to_string(), "3.99");
        assert_eq!(parse_money(&json!("7.5"), 5, 2).unwrap().to_string(), "7.50");
        assert_eq!(parse_money(&json!(4), 5, 2).unwrap().to_string(), "4.00");
    }

    #[test]
    fn money_rejects_out_of_range_values() {
        assert!(parse_money(&json!(-1), 5, 2).is_err());
        assert!(parse_money(&json!("1.234"), 5, 2).is_err());
        assert!(parse_money(&json!(1000), 5, 2).is_err());
        assert!(parse_money(&json!("abc"), 5, 2).is_err());
        assert!(parse_money(&json!(true), 5, 2).is_err());
        assert_eq!(parse_money(&json!("999.99"), 5, 2).unwrap().to_string(), "999.99");
    }

    #[test]
    fn integer_must_be_non_negative() {
        assert_eq!(parse_non_negative_i32(&json!(5)), Ok(5));
        assert_eq!(parse_non_negative_i32(&json!("10")), Ok(10));
        assert!(parse_non_negative_i32(&json!(-1)).is_err());
        assert!(parse_non_negative_i32(&json!(2.5)).is_err());
        assert!(parse_non_negative_i32(&json!(i64::MAX)).is_err());
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(parse_name(&json!("  Vegan "), 255), Ok("Vegan".to_string()));
        assert!(parse_name(&json!("   "), 255).is_err());
        assert!(parse_name(&json!(12), 255).is_err());
        assert!(parse_name(&json!("x".repeat(256)), 255).is_err());
    }

    #[test]
    fn name_list_deduplicates() {
        let names = parse_name_list(&json!([{"name": "Lunch"}, {"name": "Vegan"}, {"name": "Lunch"}])).unwrap();
        assert_eq!(names, vec!["Lunch".to_string(), "Vegan".to_string()]);
        assert!(parse_name_list(&json!([{"title": "x"}])).is_err());
        assert!(parse_name_list(&json!("Lunch")).is_err());
    }

    #[test]
    fn first_error_per_field_is_kept() {
        let mut errors = FieldErrors::new();
        errors.add("name", "first");
        errors.add("name", "second");
        assert_eq!(errors.get("name"), Some("first"));
        assert!(errors.finish(|| ()).is_err());
    }
}
