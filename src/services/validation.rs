//! Schema-driven validation and normalization
//!
//! Turns untrusted JSON objects into normalized [`FieldValues`] according to an
//! [`EntitySchema`]. Every offending field is reported, not just the first.
//!
//! Each field goes through the same phases whatever order its rules are
//! declared in:
//! 1. type coercion
//! 2. trim, blank-as-null, non-empty, max length, case folding (text)
//! 3. numeric bounds, year window, rounding (numbers)
//!
//! Bounds are checked against the value as received; rounding comes last.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use serde_json::{Map, Value as Json};
use thiserror::Error;

use crate::models::{EntitySchema, FieldKind, FieldSpec, FieldValues, Limit, Presence, Rule, Value};

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every field that failed validation, in schema order
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", self.summary())]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, message)],
        }
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }

    /// `field: message` pairs joined by `; `
    fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|error| format!("{}: {}", error.field, error.message))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// `Ok(value)` when nothing was recorded
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Validate a creation payload against the current clock
pub fn validate_create(
    schema: &EntitySchema,
    input: &Map<String, Json>,
) -> Result<FieldValues, ValidationErrors> {
    validate_create_at(schema, input, Utc::now())
}

/// Validate a creation payload.
///
/// Required fields must be present, optional fields default to null,
/// defaulted and generated fields take their fallback. Unknown keys are ignored.
pub fn validate_create_at(
    schema: &EntitySchema,
    input: &Map<String, Json>,
    now: DateTime<Utc>,
) -> Result<FieldValues, ValidationErrors> {
    let mut values = FieldValues::new();
    let mut errors = ValidationErrors::new();

    for field in schema.fields {
        if let Presence::Generated(fallback) = field.presence {
            values.insert(field.name.to_string(), fallback.resolve(now));
            continue;
        }

        let value = match input.get(field.name).filter(|raw| !raw.is_null()) {
            Some(raw) => match normalize_field(field, raw, now.year() as i64) {
                Ok(value) => value,
                Err(message) => {
                    errors.push(field.name, message);
                    continue;
                }
            },
            None => match field.presence {
                Presence::Required => {
                    errors.push(field.name, "Field required");
                    continue;
                }
                Presence::Default(fallback) => fallback.resolve(now),
                _ => Value::Null,
            },
        };

        values.insert(field.name.to_string(), value);
    }

    errors.into_result(values)
}

/// Validate a partial update payload against the current clock
pub fn validate_update(
    schema: &EntitySchema,
    input: &Map<String, Json>,
) -> Result<FieldValues, ValidationErrors> {
    validate_update_at(schema, input, Utc::now())
}

/// Validate a partial update payload.
///
/// Only keys that are present and non-null are considered; generated fields and
/// unknown keys are ignored. Values normalized away (blank-as-null) are dropped.
/// An empty result means the update carries no changes.
pub fn validate_update_at(
    schema: &EntitySchema,
    input: &Map<String, Json>,
    now: DateTime<Utc>,
) -> Result<FieldValues, ValidationErrors> {
    let mut values = FieldValues::new();
    let mut errors = ValidationErrors::new();

    for field in schema.fields.iter().filter(|field| !field.is_generated()) {
        let Some(raw) = input.get(field.name).filter(|raw| !raw.is_null()) else {
            continue;
        };

        match normalize_field(field, raw, now.year() as i64) {
            Ok(Value::Null) => {}
            Ok(value) => {
                values.insert(field.name.to_string(), value);
            }
            Err(message) => errors.push(field.name, message),
        }
    }

    errors.into_result(values)
}

fn normalize_field(field: &FieldSpec, raw: &Json, current_year: i64) -> Result<Value, String> {
    match field.kind {
        FieldKind::Text => {
            let text = raw.as_str().ok_or("Input should be a valid string")?;
            normalize_text(field, text)
        }
        FieldKind::Integer => {
            let number = coerce_integer(raw)?;
            check_numeric(field, number as f64, current_year)?;
            Ok(Value::Integer(number))
        }
        FieldKind::Float => {
            let number = coerce_float(raw)?;
            check_numeric(field, number, current_year)?;
            Ok(Value::Float(apply_rounding(field, number)))
        }
        FieldKind::Bool => coerce_bool(raw, field.has_rule(Rule::TruthyText)).map(Value::Bool),
        FieldKind::Timestamp => {
            let text = raw.as_str().ok_or("Input should be a valid datetime")?;
            DateTime::parse_from_rfc3339(text.trim())
                .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
                .map_err(|_| "Input should be a valid RFC 3339 datetime".to_string())
        }
    }
}

fn normalize_text(field: &FieldSpec, raw: &str) -> Result<Value, String> {
    let mut text = if field.has_rule(Rule::Trim) {
        raw.trim().to_string()
    } else {
        raw.to_string()
    };

    if text.trim().is_empty() {
        if field.has_rule(Rule::BlankAsNull) {
            return Ok(Value::Null);
        }
        if field.has_rule(Rule::NonEmpty) {
            return Err("Field cannot be empty or whitespace".to_string());
        }
    }

    if let Some(max) = field.max_length() {
        if text.chars().count() > max {
            return Err(format!("String should have at most {} characters", max));
        }
    }

    if field.has_rule(Rule::TitleCase) {
        text = title_case(&text);
    } else if field.has_rule(Rule::Lowercase) {
        text = text.to_lowercase();
    }

    Ok(Value::Text(text))
}

fn coerce_integer(raw: &Json) -> Result<i64, String> {
    const MESSAGE: &str = "Input should be a valid integer";
    match raw {
        Json::Number(number) => number
            .as_i64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .ok_or_else(|| MESSAGE.to_string()),
        Json::String(text) => text.trim().parse::<i64>().map_err(|_| MESSAGE.to_string()),
        _ => Err(MESSAGE.to_string()),
    }
}

fn coerce_float(raw: &Json) -> Result<f64, String> {
    const MESSAGE: &str = "Input should be a valid number";
    let number = match raw {
        Json::Number(number) => number.as_f64(),
        Json::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .filter(|f| f.is_finite())
        .ok_or_else(|| MESSAGE.to_string())
}

fn coerce_bool(raw: &Json, truthy_text: bool) -> Result<bool, String> {
    match raw {
        Json::Bool(b) => Ok(*b),
        Json::Number(number) => Ok(number.as_f64().is_some_and(|n| n != 0.0)),
        Json::String(text) if truthy_text => Ok(is_truthy(text)),
        _ => Err("Input should be a valid boolean".to_string()),
    }
}

/// `true`, `1` and `yes` (any case) are true; every other string is false
pub fn is_truthy(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

fn check_numeric(field: &FieldSpec, number: f64, current_year: i64) -> Result<(), String> {
    for rule in field.rules {
        match rule {
            Rule::Range { min, max } => {
                if let Some(min) = min {
                    match min {
                        Limit::Inclusive(v) if number < *v => {
                            return Err(format!("Input should be greater than or equal to {}", v))
                        }
                        Limit::Exclusive(v) if number <= *v => {
                            return Err(format!("Input should be greater than {}", v))
                        }
                        _ => {}
                    }
                }
                if let Some(max) = max {
                    match max {
                        Limit::Inclusive(v) if number > *v => {
                            return Err(format!("Input should be less than or equal to {}", v))
                        }
                        Limit::Exclusive(v) if number >= *v => {
                            return Err(format!("Input should be less than {}", v))
                        }
                        _ => {}
                    }
                }
            }
            Rule::YearUpToCurrent { min } => {
                if number < *min as f64 || number > current_year as f64 {
                    return Err(format!(
                        "Year must be between {} and {}",
                        min, current_year
                    ));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn apply_rounding(field: &FieldSpec, number: f64) -> f64 {
    field
        .rules
        .iter()
        .find_map(|rule| match rule {
            Rule::Round(places) => Some(round_to(number, *places)),
            _ => None,
        })
        .unwrap_or(number)
}

/// Round half away from zero to `places` decimal places
pub fn round_to(number: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (number * factor).round() / factor
}

/// Capitalize the first letter of every word and lowercase the rest.
///
/// A word starts at any letter not preceded by another letter, so
/// `"o'neil"` becomes `"O'Neil"`.
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(c);
            previous_is_letter = false;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::{BOOKS, MOVIES, PRODUCTS, REVIEWS};
    use chrono::TimeZone;
    use proptest::prelude::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn object(value: Json) -> Map<String, Json> {
        value.as_object().cloned().unwrap()
    }

    fn valid_book() -> Json {
        json!({
            "title": "Dune",
            "author": "Frank Herbert",
            "published_year": 1965,
            "price": 9.99
        })
    }

    #[test]
    fn test_create_book_normalizes_and_fills_defaults() {
        let input = object(json!({
            "title": "  Dune  ",
            "author": " Frank Herbert ",
            "published_year": 1965,
            "price": 9.999,
            "genre": "science FICTION"
        }));

        let values = validate_create_at(&BOOKS, &input, now()).unwrap();

        assert_eq!(values["title"], Value::from("Dune"));
        assert_eq!(values["author"], Value::from("Frank Herbert"));
        assert_eq!(values["price"], Value::Float(10.0));
        assert_eq!(values["genre"], Value::from("Science Fiction"));
        assert_eq!(values["description"], Value::Null);
        assert_eq!(values["created_at"], Value::Timestamp(now()));
    }

    #[test]
    fn test_create_ignores_client_supplied_generated_field() {
        let mut input = object(valid_book());
        input.insert("created_at".to_string(), json!("1999-01-01T00:00:00Z"));
        input.insert("unknown".to_string(), json!("ignored"));

        let values = validate_create_at(&BOOKS, &input, now()).unwrap();

        assert_eq!(values["created_at"], Value::Timestamp(now()));
        assert!(!values.contains_key("unknown"));
    }

    #[test]
    fn test_create_reports_every_offending_field() {
        let input = object(json!({
            "title": "   ",
            "published_year": 3000,
            "price": 0
        }));

        let errors = validate_create_at(&BOOKS, &input, now()).unwrap_err();

        assert!(errors.has_field("title"));
        assert!(errors.has_field("author"));
        assert!(errors.has_field("published_year"));
        assert!(errors.has_field("price"));
        assert_eq!(errors.errors().len(), 4);
    }

    #[test]
    fn test_blank_optional_genre_becomes_null() {
        let mut input = object(valid_book());
        input.insert("genre".to_string(), json!("   "));

        let values = validate_create_at(&BOOKS, &input, now()).unwrap();
        assert_eq!(values["genre"], Value::Null);
    }

    #[test]
    fn test_max_length_applies_after_trim() {
        let mut input = object(valid_book());
        input.insert("genre".to_string(), json!(format!("  {}  ", "a".repeat(50))));
        assert!(validate_create_at(&BOOKS, &input, now()).is_ok());

        input.insert("genre".to_string(), json!("a".repeat(51)));
        let errors = validate_create_at(&BOOKS, &input, now()).unwrap_err();
        assert!(errors.has_field("genre"));
    }

    #[test]
    fn test_year_window_uses_validation_time() {
        let mut input = object(valid_book());
        input.insert("published_year".to_string(), json!(2024));
        assert!(validate_create_at(&BOOKS, &input, now()).is_ok());

        input.insert("published_year".to_string(), json!(2025));
        assert!(validate_create_at(&BOOKS, &input, now()).is_err());

        input.insert("published_year".to_string(), json!(999));
        assert!(validate_create_at(&BOOKS, &input, now()).is_err());
    }

    #[test]
    fn test_bounds_checked_before_rounding() {
        let mut input = object(valid_book());
        input.insert("price".to_string(), json!(0.004));

        let values = validate_create_at(&BOOKS, &input, now()).unwrap();
        assert_eq!(values["price"], Value::Float(0.0));

        input.insert("price".to_string(), json!(-0.001));
        assert!(validate_create_at(&BOOKS, &input, now()).is_err());
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let mut input = object(valid_book());
        input.insert("published_year".to_string(), json!("1965"));
        input.insert("price".to_string(), json!("12.5"));

        let values = validate_create_at(&BOOKS, &input, now()).unwrap();
        assert_eq!(values["published_year"], Value::Integer(1965));
        assert_eq!(values["price"], Value::Float(12.5));
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let mut input = object(valid_book());
        input.insert("title".to_string(), json!(42));
        input.insert("published_year".to_string(), json!(1965.5));

        let errors = validate_create_at(&BOOKS, &input, now()).unwrap_err();
        assert!(errors.has_field("title"));
        assert!(errors.has_field("published_year"));
    }

    #[test]
    fn test_movie_title_case_and_rating_rounding() {
        let input = object(json!({
            "title": "the GODFATHER",
            "director": "francis ford coppola",
            "genre": "crime",
            "release_year": 1972,
            "rating": 9.25
        }));

        let values = validate_create_at(&MOVIES, &input, now()).unwrap();

        assert_eq!(values["title"], Value::from("The Godfather"));
        assert_eq!(values["director"], Value::from("Francis Ford Coppola"));
        assert_eq!(values["genre"], Value::from("Crime"));
        assert_eq!(values["rating"], Value::Float(9.3));
        assert_eq!(values["is_favorite"], Value::Bool(false));
    }

    #[test]
    fn test_movie_release_year_lower_bound() {
        let input = object(json!({
            "title": "Old",
            "director": "Someone",
            "genre": "Silent",
            "release_year": 1887,
            "rating": 5
        }));

        let errors = validate_create_at(&MOVIES, &input, now()).unwrap_err();
        assert_eq!(errors.errors()[0].field, "release_year");
        assert_eq!(errors.errors()[0].message, "Year must be between 1888 and 2024");
    }

    #[test]
    fn test_truthy_text_favorite() {
        let base = json!({
            "title": "Heat",
            "director": "Michael Mann",
            "genre": "Crime",
            "release_year": 1995,
            "rating": 8.3
        });

        for (input, expected) in [
            (json!("YES"), true),
            (json!("1"), true),
            (json!("true"), true),
            (json!("nope"), false),
            (json!(""), false),
            (json!(true), true),
            (json!(0), false),
            (json!(2), true),
            (json!(-1), true),
            (json!(0.5), true),
        ] {
            let mut payload = object(base.clone());
            payload.insert("is_favorite".to_string(), input.clone());
            let values = validate_create_at(&MOVIES, &payload, now()).unwrap();
            assert_eq!(values["is_favorite"], Value::Bool(expected), "input {input}");
        }
    }

    #[test]
    fn test_product_quantity_must_be_non_negative() {
        let input = object(json!({
            "name": "Widget",
            "category": "Tools",
            "price": 3.5,
            "quantity": -1
        }));

        let errors = validate_create_at(&PRODUCTS, &input, now()).unwrap_err();
        assert!(errors.has_field("quantity"));
        assert!(!errors.has_field("price"));
    }

    #[test]
    fn test_review_date_defaults_or_parses() {
        let input = object(json!({
            "name": "Ana",
            "product": "Widget",
            "rating": 4.44,
            "review": "Solid"
        }));
        let values = validate_create_at(&REVIEWS, &input, now()).unwrap();
        assert_eq!(values["date"], Value::Timestamp(now()));
        assert_eq!(values["rating"], Value::Float(4.4));

        let mut dated = input.clone();
        dated.insert("date".to_string(), json!("2023-02-03T04:05:06Z"));
        let values = validate_create_at(&REVIEWS, &dated, now()).unwrap();
        assert_eq!(
            values["date"],
            Value::Timestamp(Utc.with_ymd_and_hms(2023, 2, 3, 4, 5, 6).unwrap())
        );

        dated.insert("date".to_string(), json!("yesterday"));
        assert!(validate_create_at(&REVIEWS, &dated, now()).is_err());
    }

    #[test]
    fn test_update_keeps_only_supplied_fields() {
        let input = object(json!({ "price": 15.505, "title": null, "unknown": 1 }));

        let values = validate_update_at(&BOOKS, &input, now()).unwrap();

        assert_eq!(values.len(), 1);
        assert_eq!(values["price"], Value::Float(round_to(15.505, 2)));
    }

    #[test]
    fn test_update_with_nothing_usable_is_empty() {
        let input = object(json!({
            "created_at": "2020-01-01T00:00:00Z",
            "genre": "  ",
            "title": null
        }));
        let values = validate_update_at(&BOOKS, &input, now()).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn test_update_rejects_invalid_values() {
        let input = object(json!({ "title": "", "price": -3 }));
        let errors = validate_update_at(&BOOKS, &input, now()).unwrap_err();
        assert!(errors.has_field("title"));
        assert!(errors.has_field("price"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("science fiction"), "Science Fiction");
        assert_eq!(title_case("SCI-FI"), "Sci-Fi");
        assert_eq!(title_case("o'neil"), "O'Neil");
        assert_eq!(title_case("2001: a space odyssey"), "2001: A Space Odyssey");
    }

    #[test]
    fn test_non_boolean_values_are_rejected() {
        let mut payload = object(json!({
            "title": "Heat",
            "director": "Michael Mann",
            "genre": "Crime",
            "release_year": 1995,
            "rating": 8.3
        }));
        payload.insert("is_favorite".to_string(), json!([1]));

        let errors = validate_create_at(&MOVIES, &payload, now()).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[FieldError::new("is_favorite", "Input should be a valid boolean")]
        );
    }

    static CONTACTS: EntitySchema = EntitySchema {
        collection: "contacts",
        entity_name: "Contact",
        display_field: "email",
        fields: &[FieldSpec {
            name: "email",
            kind: FieldKind::Text,
            presence: Presence::Required,
            rules: &[Rule::Lowercase, Rule::Trim, Rule::NonEmpty, Rule::MaxLength(20)],
        }],
        filters: &[],
        sortable: &[],
        indexes: &[],
        computed: &[],
    };

    #[test]
    fn test_lowercase_rule_folds_after_trim() {
        let input = object(json!({ "email": "  ALICE@Example.COM " }));
        let values = validate_create_at(&CONTACTS, &input, now()).unwrap();
        assert_eq!(values["email"], Value::from("alice@example.com"));

        let input = object(json!({ "email": "ÉLODIE@EXAMPLE.FR" }));
        let values = validate_update_at(&CONTACTS, &input, now()).unwrap();
        assert_eq!(values["email"], Value::from("élodie@example.fr"));
    }

    #[test]
    fn test_lowercase_rule_checks_length_before_folding() {
        let input = object(json!({ "email": "A".repeat(21) }));
        let errors = validate_create_at(&CONTACTS, &input, now()).unwrap_err();
        assert!(errors.has_field("email"));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(9.999, 2), 10.0);
        assert_eq!(round_to(1.25, 1), 1.3);
        assert_eq!(round_to(7.0, 2), 7.0);
    }

    #[test]
    fn test_display_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.push("title", "Field required");
        errors.push("price", "Input should be greater than 0");
        assert_eq!(
            errors.to_string(),
            "title: Field required; price: Input should be greater than 0"
        );
    }

    proptest! {
        #[test]
        fn accepted_text_is_trimmed_and_bounded(title in "\\PC{0,220}") {
            let mut input = object(valid_book());
            input.insert("title".to_string(), json!(title));

            if let Ok(values) = validate_create_at(&BOOKS, &input, now()) {
                let stored = values["title"].as_text().unwrap().to_string();
                prop_assert_eq!(stored.trim(), stored.as_str());
                prop_assert!(!stored.is_empty());
                prop_assert!(stored.chars().count() <= 200);
            }
        }

        #[test]
        fn accepted_price_has_two_decimals(price in 0.001f64..100_000.0) {
            let mut input = object(valid_book());
            input.insert("price".to_string(), json!(price));

            let values = validate_create_at(&BOOKS, &input, now()).unwrap();
            let stored = values["price"].as_f64().unwrap();
            prop_assert!((stored - price).abs() <= 0.005 + 1e-9);
            prop_assert!((stored * 100.0 - (stored * 100.0).round()).abs() < 1e-6);
        }
    }
}
