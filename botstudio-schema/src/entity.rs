use serde::{Deserialize, Serialize};

/// Entity as listed by `GET /entities` and returned by `GET /entity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_name: String,
    #[serde(default)]
    pub entity_values: Vec<String>,
    #[serde(default)]
    pub is_system: bool,
}

impl Entity {
    /// Custom entities first, then alphabetical by name.
    pub fn sort_for_display(entities: &mut [Entity]) {
        entities.sort_by(|a, b| {
            (a.is_system, a.entity_name.as_str()).cmp(&(b.is_system, b.entity_name.as_str()))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str, is_system: bool) -> Entity {
        Entity {
            entity_name: name.to_string(),
            entity_values: Vec::new(),
            is_system,
        }
    }

    #[test]
    fn custom_entities_sort_before_system_ones() {
        let mut entities = vec![
            entity("sys.places", true),
            entity("zebra", false),
            entity("sys.date", true),
            entity("apple", false),
        ];
        Entity::sort_for_display(&mut entities);

        let names: Vec<&str> = entities.iter().map(|e| e.entity_name.as_str()).collect();
        assert_eq!(names, vec!["apple", "zebra", "sys.date", "sys.places"]);
    }
}
