//! Validation and reshaping of browser input before anything reaches the network.
//!
//! Every form exposes `parse(&FormData, ...) -> Result<Cleaned, FormErrors>`; a failed parse
//! never triggers an upstream call.

pub mod ai;
pub mod entity;
pub mod intent;
pub mod publish;
pub mod users;

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::api::UploadedFile;

/// Key of errors that belong to no single field.
pub const NON_FIELD_ERRORS: &str = "__all__";

pub(crate) static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_ ]+$").expect("static regex"));
pub(crate) static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("static regex"));
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)+$").expect("static regex")
});

/// Submitted fields (urlencoded or multipart) and uploaded files.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    fields: Vec<(String, String)>,
    files: Vec<(String, UploadedFile)>,
}

impl FormData {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self {
            fields,
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, name: &str, file: UploadedFile) -> Self {
        self.files.push((name.to_string(), file));
        self
    }

    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.fields.push((name.to_string(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Trimmed value, empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.get(name).map(str::trim).unwrap_or_default().to_string()
    }

    /// HTML checkbox semantics: present and not an explicit false.
    pub fn checkbox(&self, name: &str) -> bool {
        matches!(
            self.get(name).map(|v| v.trim().to_ascii_lowercase()).as_deref(),
            Some("on" | "true" | "1" | "yes")
        )
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|(k, _)| k == name).map(|(_, f)| f)
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.fields.iter().any(|(k, _)| k.starts_with(prefix))
    }

    /// First value of every field, for re-rendering a form.
    pub fn values(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (k, v) in &self.fields {
            out.entry(k.clone()).or_insert_with(|| v.clone());
        }
        out
    }
}

/// Field name -> messages. `__all__` carries non-field errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn non_field(&mut self, message: impl Into<String>) {
        self.add(NON_FIELD_ERRORS, message);
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn extend(&mut self, other: FormErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }
}

/// Splits a delimiter-joined token field; empty pieces are dropped.
pub fn split_tokens(value: &str, delimiter: &str) -> Vec<String> {
    if delimiter.is_empty() {
        let value = value.trim();
        return if value.is_empty() {
            Vec::new()
        } else {
            vec![value.to_string()]
        };
    }
    value
        .split(delimiter)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_tokens<S: AsRef<str>>(values: &[S], delimiter: &str) -> String {
    values
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(delimiter)
}

pub fn is_valid_url(value: &str) -> bool {
    match url::Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Accumulates field errors while cleaning one form (or one formset row).
pub(crate) struct Cleaner<'a> {
    data: &'a FormData,
    prefix: String,
    errors: FormErrors,
}

pub(crate) const REQUIRED: &str = "This field is required.";

impl<'a> Cleaner<'a> {
    pub fn new(data: &'a FormData) -> Self {
        Self::prefixed(data, String::new())
    }

    /// Reads `"{prefix}{name}"` and reports errors under the same key.
    pub fn prefixed(data: &'a FormData, prefix: String) -> Self {
        Self {
            data,
            prefix,
            errors: FormErrors::default(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    pub fn error(&mut self, name: &str, message: impl Into<String>) {
        let key = self.key(name);
        self.errors.add(&key, message);
    }

    pub fn optional(&self, name: &str) -> String {
        self.data.text(&self.key(name))
    }

    pub fn required(&mut self, name: &str) -> String {
        let value = self.optional(name);
        if value.is_empty() {
            self.error(name, REQUIRED);
        }
        value
    }

    pub fn checkbox(&self, name: &str) -> bool {
        self.data.checkbox(&self.key(name))
    }

    pub fn max_len(&mut self, name: &str, value: &str, max: usize) {
        let len = value.chars().count();
        if len > max {
            self.error(
                name,
                format!("Ensure this value has at most {max} characters (it has {len})."),
            );
        }
    }

    pub fn min_len(&mut self, name: &str, value: &str, min: usize) {
        let len = value.chars().count();
        if !value.is_empty() && len < min {
            self.error(
                name,
                format!("Ensure this value has at least {min} characters (it has {len})."),
            );
        }
    }

    pub fn pattern(&mut self, name: &str, value: &str, re: &Regex, message: &str) {
        if !value.is_empty() && !re.is_match(value) {
            self.error(name, message);
        }
    }

    pub fn choice(&mut self, name: &str, value: &str, choices: &[&str]) {
        if !value.is_empty() && !choices.contains(&value) {
            self.error(
                name,
                format!("Select a valid choice. {value} is not one of the available choices."),
            );
        }
    }

    pub fn url(&mut self, name: &str, value: &str) {
        if !value.is_empty() && !is_valid_url(value) {
            self.error(name, "Enter a valid URL.");
        }
    }

    pub fn email(&mut self, name: &str, value: &str) {
        if !value.is_empty() && !is_valid_email(value) {
            self.error(name, "Enter a valid email address.");
        }
    }

    /// Integer in `min..=max`; `None` when empty (after recording `required`) or invalid.
    pub fn int_range(&mut self, name: &str, required: bool, min: i64, max: i64) -> Option<i64> {
        let raw = if required {
            self.required(name)
        } else {
            self.optional(name)
        };
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<i64>() {
            Ok(n) if (min..=max).contains(&n) => Some(n),
            Ok(n) if n < min => {
                self.error(
                    name,
                    format!("Ensure this value is greater than or equal to {min}."),
                );
                None
            }
            Ok(_) => {
                self.error(
                    name,
                    format!("Ensure this value is less than or equal to {max}."),
                );
                None
            }
            Err(_) => {
                self.error(name, "Enter a whole number.");
                None
            }
        }
    }

    pub fn float_range(&mut self, name: &str, required: bool, min: f64, max: f64) -> Option<f64> {
        let raw = if required {
            self.required(name)
        } else {
            self.optional(name)
        };
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() && n >= min && n <= max => Some(n),
            Ok(n) if n.is_finite() && n < min => {
                self.error(
                    name,
                    format!("Ensure this value is greater than or equal to {min}."),
                );
                None
            }
            Ok(n) if n.is_finite() => {
                self.error(
                    name,
                    format!("Ensure this value is less than or equal to {max}."),
                );
                None
            }
            _ => {
                self.error(name, "Enter a number.");
                None
            }
        }
    }

    pub fn tokens(&mut self, name: &str, delimiter: &str, required: bool) -> Vec<String> {
        let tokens = split_tokens(&self.optional(name), delimiter);
        if required && tokens.is_empty() {
            self.error(name, REQUIRED);
        }
        tokens
    }

    pub fn file(&mut self, name: &str) -> Option<UploadedFile> {
        match self.data.file(&self.key(name)) {
            Some(file) if !file.is_empty() => Some(file.clone()),
            Some(_) => {
                self.error(name, "The submitted file is empty.");
                None
            }
            None => {
                self.error(name, "No file was submitted.");
                None
            }
        }
    }

    pub fn into_errors(self) -> FormErrors {
        self.errors
    }

    pub fn finish<T>(self, cleaned: T) -> Result<T, FormErrors> {
        if self.errors.is_empty() {
            Ok(cleaned)
        } else {
            Err(self.errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELIM: &str = "\u{9D}";

    #[test]
    fn split_inverts_join() {
        let values = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(split_tokens(&join_tokens(&values, DELIM), DELIM), values);

        let phrases = vec!["Hi there".to_string(), "What, again?".to_string()];
        assert_eq!(split_tokens(&join_tokens(&phrases, DELIM), DELIM), phrases);
    }

    #[test]
    fn split_drops_empty_pieces() {
        let raw = format!("{DELIM}a{DELIM}{DELIM} b {DELIM}");
        assert_eq!(split_tokens(&raw, DELIM), vec!["a", "b"]);
        assert!(split_tokens("", DELIM).is_empty());
    }

    #[test]
    fn urls_must_be_absolute_http() {
        assert!(is_valid_url("https://example.com/hook"));
        assert!(is_valid_url("http://localhost:8080"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url("/relative"));
    }

    #[test]
    fn cleaner_collects_errors_per_field() {
        let data = FormData::new(vec![
            ("name".to_string(), "x".repeat(51)),
            ("n".to_string(), "17".to_string()),
            ("ratio".to_string(), "abc".to_string()),
        ]);
        let mut c = Cleaner::new(&data);
        let name = c.required("name");
        c.max_len("name", &name, 50);
        c.required("missing");
        assert_eq!(c.int_range("n", true, 1, 16), None);
        assert_eq!(c.float_range("ratio", false, 0.0, 1.0), None);

        let errors = c.into_errors();
        assert!(errors.has("name"));
        assert_eq!(errors.get("missing"), Some(&[REQUIRED.to_string()][..]));
        assert!(errors.has("n"));
        assert!(errors.has("ratio"));
    }

    #[test]
    fn prefixed_cleaner_reports_full_keys() {
        let data = FormData::new(vec![("ROWS-0-value".to_string(), String::new())]);
        let mut c = Cleaner::prefixed(&data, "ROWS-0-".to_string());
        c.required("value");
        assert!(c.into_errors().has("ROWS-0-value"));
    }

    #[test]
    fn checkbox_semantics() {
        let data = FormData::new(vec![
            ("a".to_string(), "on".to_string()),
            ("b".to_string(), "false".to_string()),
        ]);
        assert!(data.checkbox("a"));
        assert!(!data.checkbox("b"));
        assert!(!data.checkbox("c"));
    }
}
