//! One function per upstream endpoint.

pub mod botstore;
pub mod studio;
pub mod users;

/// Form pairs with `defaults` underneath: a caller-supplied key replaces the default.
pub(crate) fn merge_form(
    defaults: &[(&str, &str)],
    data: Vec<(String, String)>,
) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = defaults
        .iter()
        .filter(|(k, _)| !data.iter().any(|(dk, _)| dk == k))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    merged.extend(data);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_fields_override_defaults() {
        let merged = merge_form(
            &[("confidence", "0.4"), ("locale", "en-US")],
            vec![
                ("confidence".to_string(), "0.9".to_string()),
                ("name".to_string(), "bot".to_string()),
            ],
        );
        assert_eq!(
            merged,
            vec![
                ("locale".to_string(), "en-US".to_string()),
                ("confidence".to_string(), "0.9".to_string()),
                ("name".to_string(), "bot".to_string()),
            ]
        );
    }
}
