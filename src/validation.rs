use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

/// Field-keyed validation failures, serialized as `{"field": ["msg", ...]}`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[cfg(test)]
    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ok when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Required, non-blank string no longer than `max` characters.
    pub fn text(&mut self, field: &str, value: Option<String>, max: usize) -> String {
        match value {
            None => {
                self.add(field, REQUIRED);
                String::new()
            }
            Some(v) if v.trim().is_empty() => {
                self.add(field, BLANK);
                String::new()
            }
            Some(v) => {
                self.max_chars(field, &v, max);
                v
            }
        }
    }

    /// Optional string; blank collapses to None.
    pub fn optional_text(&mut self, field: &str, value: Option<String>, max: Option<usize>) -> Option<String> {
        let v = value.filter(|v| !v.trim().is_empty())?;
        if let Some(max) = max {
            self.max_chars(field, &v, max);
        }
        Some(v)
    }

    pub fn max_chars(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(field, format!("Ensure this field has no more than {max} characters."));
        }
    }

    /// Required integer strictly greater than zero.
    pub fn positive(&mut self, field: &str, value: Option<i64>) -> i32 {
        match value {
            None => {
                self.add(field, REQUIRED);
                0
            }
            Some(v) if v <= 0 => {
                self.add(field, "Ensure this value is greater than 0.");
                0
            }
            Some(v) => match i32::try_from(v) {
                Ok(v) => v,
                Err(_) => {
                    self.add(field, format!("Ensure this value is less than or equal to {}.", i32::MAX));
                    0
                }
            },
        }
    }

    /// Required primary key reference.
    pub fn reference(&mut self, field: &str, value: Option<i64>) -> i64 {
        match value {
            None => {
                self.add(field, REQUIRED);
                0
            }
            Some(v) if v <= 0 => {
                self.add(field, invalid_pk(v));
                0
            }
            Some(v) => v,
        }
    }

    /// Optional http(s) URL no longer than `max` characters.
    pub fn optional_url(&mut self, field: &str, value: Option<String>, max: usize) -> Option<String> {
        let v = self.optional_text(field, value, Some(max))?;
        match url::Url::parse(v.trim()) {
            Ok(u) if matches!(u.scheme(), "http" | "https") && u.host_str().is_some() => {}
            _ => self.add(field, "Enter a valid URL."),
        }
        Some(v.trim().to_string())
    }

    /// Required decimal with at most `max_digits` digits, `places` of them after the point.
    pub fn decimal(&mut self, field: &str, value: Option<Decimal>, max_digits: u32, places: u32) -> Decimal {
        let Some(v) = value else {
            self.add(field, REQUIRED);
            return Decimal::ZERO;
        };
        let normalized = v.normalize();
        let scale = normalized.scale();
        if scale > places {
            self.add(field, format!("Ensure that there are no more than {places} decimal places."));
        }
        let whole_digits = digit_count(normalized.trunc().abs());
        if whole_digits > max_digits - places {
            self.add(
                field,
                format!(
                    "Ensure that there are no more than {} digits before the decimal point.",
                    max_digits - places
                ),
            );
        }
        v
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, msgs)| format!("{field}: {}", msgs.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

pub fn invalid_pk(id: i64) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}

fn digit_count(whole: Decimal) -> u32 {
    let digits = whole.trunc().to_string();
    let digits = digits.trim_start_matches('-');
    if digits == "0" {
        0
    } else {
        digits.len() as u32
    }
}

/// Turns a raw request payload into a checked value.
pub trait Validate {
    type Valid;

    fn validate(self) -> Result<Self::Valid, ValidationErrors>;
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
/// Use together with `#[serde(default)]`.
pub fn nullable<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn text_reports_missing_blank_and_too_long() {
        let mut errors = ValidationErrors::new();
        errors.text("a", None, 5);
        errors.text("b", Some("   ".into()), 5);
        errors.text("c", Some("abcdef".into()), 5);
        let ok = errors.text("d", Some("abc".into()), 5);
        assert_eq!(ok, "abc");
        assert_eq!(errors.messages("a"), [REQUIRED]);
        assert_eq!(errors.messages("b"), [BLANK]);
        assert_eq!(
            errors.messages("c"),
            ["Ensure this field has no more than 5 characters."]
        );
        assert!(!errors.contains("d"));
    }

    #[test]
    fn positive_rejects_zero_and_negative() {
        let mut errors = ValidationErrors::new();
        errors.positive("zero", Some(0));
        errors.positive("negative", Some(-2024));
        let year = errors.positive("year", Some(2024));
        assert_eq!(year, 2024);
        assert!(errors.contains("zero"));
        assert!(errors.contains("negative"));
        assert!(!errors.contains("year"));
    }

    #[test]
    fn optional_url_accepts_http_and_rejects_garbage() {
        let mut errors = ValidationErrors::new();
        let site = errors.optional_url("website", Some("https://uni.ac.ke".into()), 200);
        assert_eq!(site.as_deref(), Some("https://uni.ac.ke"));
        assert!(errors.is_empty());

        errors.optional_url("website", Some("not a url".into()), 200);
        errors.optional_url("other", Some("ftp://files.example.com".into()), 200);
        assert_eq!(errors.messages("website"), ["Enter a valid URL."]);
        assert!(errors.contains("other"));

        assert_eq!(errors.optional_url("blank", Some("".into()), 200), None);
        assert!(!errors.contains("blank"));
    }

    #[test]
    fn decimal_enforces_places_and_digits() {
        let mut errors = ValidationErrors::new();
        errors.decimal("ok", Some(Decimal::from_str("12345678.90").unwrap()), 10, 2);
        errors.decimal("places", Some(Decimal::from_str("1.234").unwrap()), 10, 2);
        errors.decimal("digits", Some(Decimal::from_str("123456789.0").unwrap()), 10, 2);
        errors.decimal("missing", None, 10, 2);
        assert!(!errors.contains("ok"));
        assert!(errors.contains("places"));
        assert!(errors.contains("digits"));
        assert_eq!(errors.messages("missing"), [REQUIRED]);
    }

    #[test]
    fn serializes_as_field_map() {
        let mut errors = ValidationErrors::single("year", "bad");
        errors.add("year", "worse");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({"year": ["bad", "worse"]}));
    }

    #[test]
    fn nullable_distinguishes_absent_from_null() {
        #[derive(Deserialize)]
        struct Patch {
            #[serde(default, deserialize_with = "nullable")]
            website: Option<Option<String>>,
        }
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"website": null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"website": "https://a.b"}"#).unwrap();
        assert_eq!(absent.website, None);
        assert_eq!(null.website, Some(None));
        assert_eq!(set.website, Some(Some("https://a.b".into())));
    }
}
