use super::{Cleaner, FormData, FormErrors, SLUG_RE};

const SLUG_MESSAGE: &str = "Use only letters, numbers, hyphens and underscores.";
const DUPLICATE_MESSAGE: &str = "Entity values must be unique.";

#[derive(Debug, Clone, PartialEq)]
pub struct EntityForm {
    pub entity_name: String,
    pub entity_values: Vec<String>,
}

impl EntityForm {
    pub fn parse(data: &FormData, delimiter: &str) -> Result<Self, FormErrors> {
        let mut c = Cleaner::new(data);

        let entity_name = c.required("entity_name");
        c.max_len("entity_name", &entity_name, 250);
        c.pattern("entity_name", &entity_name, &SLUG_RE, SLUG_MESSAGE);

        let entity_values = c.tokens("entity_values", delimiter, true);
        let mut seen = std::collections::HashSet::new();
        if !entity_values.iter().all(|v| seen.insert(v.to_lowercase())) {
            c.error("entity_values", DUPLICATE_MESSAGE);
        }

        c.finish(Self {
            entity_name,
            entity_values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_requires_slug_and_values() {
        let data = FormData::new(vec![
            ("entity_name".to_string(), "has space".to_string()),
            ("entity_values".to_string(), String::new()),
        ]);
        let errors = EntityForm::parse(&data, ",").unwrap_err();
        assert!(errors.has("entity_name"));
        assert!(errors.has("entity_values"));
    }

    #[test]
    fn entity_values_are_split_on_the_delimiter() {
        let data = FormData::new(vec![
            ("entity_name".to_string(), "colour".to_string()),
            ("entity_values".to_string(), "red,green".to_string()),
        ]);
        let form = EntityForm::parse(&data, ",").unwrap();
        assert_eq!(form.entity_name, "colour");
        assert_eq!(form.entity_values, vec!["red", "green"]);
    }

    #[test]
    fn duplicate_entity_values_are_rejected() {
        let data = FormData::new(vec![
            ("entity_name".to_string(), "colour".to_string()),
            ("entity_values".to_string(), "red,Red".to_string()),
        ]);
        let errors = EntityForm::parse(&data, ",").unwrap_err();
        assert_eq!(
            errors.get("entity_values"),
            Some(&[DUPLICATE_MESSAGE.to_string()][..])
        );
    }
}
