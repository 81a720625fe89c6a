//! The intent editor: one main form plus four row formsets.
//!
//! Formset rows arrive Django style as `PREFIX-N-field`, with `PREFIX-TOTAL_FORMS` naming the
//! row count and `PREFIX-N-DELETE` dropping a row. Rows whose fields are all blank are ignored.

use botstudio_schema::{Condition, Intent, IntentVariable, Webhook};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::{Cleaner, FormData, FormErrors, SLUG_RE, join_tokens};

pub const OPERATORS: &[&str] = &[
    "SET",
    "NOT_SET",
    "EQUALS",
    "NOT_EQUALS",
    "GREATER_THAN",
    "GREATER_THAN_OR_EQUALS",
    "SMALLER_THAN",
    "SMALLER_THAN_OR_EQUALS",
];

pub const MAX_PROMPTS: i64 = 16;
/// Upper bound on rows read from one formset.
pub const MAX_ROWS: usize = 1000;

/// Turn count used when `lifetime_turns` is left blank: keep the value for the whole chat.
pub const DEFAULT_LIFETIME_TURNS: i32 = -1;

const SLUG_MESSAGE: &str = "Use only letters, numbers, hyphens and underscores.";

#[derive(Debug, Clone, PartialEq)]
pub struct IntentForm {
    pub intent_name: String,
    pub user_says: Vec<String>,
    pub responses: Vec<String>,
    pub webhook: Webhook,
}

impl IntentForm {
    pub fn parse(data: &FormData, delimiter: &str) -> Result<Self, FormErrors> {
        let mut c = Cleaner::new(data);

        let intent_name = c.required("intent_name");
        c.max_len("intent_name", &intent_name, 250);
        c.pattern("intent_name", &intent_name, &SLUG_RE, SLUG_MESSAGE);

        let user_says = c.tokens("user_says", delimiter, true);
        let responses = c.tokens("responses", delimiter, true);

        let endpoint = c.optional("webhook");
        c.url("webhook", &endpoint);

        let webhook = Webhook {
            intent_name: intent_name.clone(),
            enabled: !endpoint.is_empty(),
            endpoint,
        };

        c.finish(Self {
            intent_name,
            user_says,
            responses,
            webhook,
        })
    }

    /// The single JSON document posted to `/intent/{aiid}`.
    pub fn payload(
        &self,
        conditions_in: Vec<Condition>,
        variables: Vec<IntentVariable>,
        context_in: BTreeMap<String, String>,
        context_out: BTreeMap<String, String>,
    ) -> Value {
        let intent = Intent {
            intent_name: self.intent_name.clone(),
            user_says: self.user_says.clone(),
            responses: self.responses.clone(),
            variables,
            webhook: Some(self.webhook.clone()),
            context_in,
            context_out,
            conditions_in,
            extra: BTreeMap::new(),
        };
        serde_json::to_value(intent).unwrap_or(Value::Null)
    }
}

/// Indices of the live rows of a formset.
fn live_rows(data: &FormData, prefix: &str, fields: &[&str]) -> Vec<usize> {
    let total = data
        .text(&format!("{prefix}-TOTAL_FORMS"))
        .parse::<usize>()
        .unwrap_or_else(|_| inferred_total(data, prefix))
        .min(MAX_ROWS);

    (0..total)
        .filter(|i| {
            let row = format!("{prefix}-{i}-");
            !data.checkbox(&format!("{row}DELETE"))
                && fields
                    .iter()
                    .any(|f| !data.text(&format!("{row}{f}")).is_empty())
        })
        .collect()
}

/// Without a management form, count up to the highest index present.
fn inferred_total(data: &FormData, prefix: &str) -> usize {
    let lead = format!("{prefix}-");
    data.values()
        .keys()
        .filter_map(|k| k.strip_prefix(&lead))
        .filter_map(|rest| rest.split_once('-'))
        .filter_map(|(n, _)| n.parse::<usize>().ok())
        .map(|n| n + 1)
        .max()
        .unwrap_or(0)
}

pub struct ConditionsFormset;

impl ConditionsFormset {
    pub const PREFIX: &'static str = "CONDITIONS";
    pub const FIELDS: &'static [&'static str] = &["variable", "operator", "value"];

    pub fn parse(data: &FormData) -> Result<Vec<Condition>, FormErrors> {
        let mut errors = FormErrors::default();
        let mut out = Vec::new();
        for i in live_rows(data, Self::PREFIX, Self::FIELDS) {
            let mut c = Cleaner::prefixed(data, format!("{}-{i}-", Self::PREFIX));
            let variable = c.required("variable");
            let operator = c.required("operator");
            c.choice("operator", &operator, OPERATORS);
            let value = if matches!(operator.as_str(), "SET" | "NOT_SET") {
                c.optional("value")
            } else {
                c.required("value")
            };
            match c.finish(Condition {
                variable,
                operator,
                value,
            }) {
                Ok(condition) => out.push(condition),
                Err(e) => errors.extend(e),
            }
        }
        if errors.is_empty() { Ok(out) } else { Err(errors) }
    }
}

pub struct EntityFormset;

impl EntityFormset {
    pub const PREFIX: &'static str = "ENTITIES";
    pub const FIELDS: &'static [&'static str] = &[
        "entity_name",
        "n_prompts",
        "prompts",
        "value",
        "label",
        "lifetime_turns",
    ];

    pub fn parse(
        data: &FormData,
        available: &[String],
        delimiter: &str,
    ) -> Result<Vec<IntentVariable>, FormErrors> {
        let mut errors = FormErrors::default();
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for i in live_rows(data, Self::PREFIX, Self::FIELDS) {
            let mut c = Cleaner::prefixed(data, format!("{}-{i}-", Self::PREFIX));

            let entity_name = c.required("entity_name");
            if !entity_name.is_empty() && !available.contains(&entity_name) {
                c.error(
                    "entity_name",
                    format!(
                        "Select a valid choice. {entity_name} is not one of the available choices."
                    ),
                );
            } else if !entity_name.is_empty() && !seen.insert(entity_name.clone()) {
                c.error("entity_name", "Each entity can be used only once per intent.");
            }

            let required = c.checkbox("required");
            let n_prompts = c.int_range("n_prompts", true, 1, MAX_PROMPTS).unwrap_or(1);
            let prompts = c.tokens("prompts", delimiter, required);
            let value = c.optional("value");
            let label = c.optional("label");
            let lifetime_turns = c
                .int_range("lifetime_turns", false, i64::from(i32::MIN), i64::from(i32::MAX))
                .and_then(|n| i32::try_from(n).ok())
                .unwrap_or(DEFAULT_LIFETIME_TURNS);
            let persistent = c.checkbox("persistent");

            match c.finish(IntentVariable {
                entity_name,
                required,
                n_prompts: u32::try_from(n_prompts).unwrap_or(1),
                prompts,
                value,
                label,
                lifetime_turns,
                persistent,
            }) {
                Ok(variable) => out.push(variable),
                Err(e) => errors.extend(e),
            }
        }
        if errors.is_empty() { Ok(out) } else { Err(errors) }
    }
}

/// Rows of `(variable, value)` collapsed into a map.
pub struct ContextFormset;

impl ContextFormset {
    pub const IN_PREFIX: &'static str = "CONTEXT_IN";
    pub const OUT_PREFIX: &'static str = "CONTEXT_OUT";
    pub const FIELDS: &'static [&'static str] = &["variable", "value"];

    pub fn parse(data: &FormData, prefix: &str) -> Result<BTreeMap<String, String>, FormErrors> {
        let mut errors = FormErrors::default();
        let mut out = BTreeMap::new();
        for i in live_rows(data, prefix, Self::FIELDS) {
            let mut c = Cleaner::prefixed(data, format!("{prefix}-{i}-"));
            let variable = c.required("variable");
            let value = c.optional("value");
            match c.finish((variable, value)) {
                Ok((variable, value)) => {
                    out.insert(variable, value);
                }
                Err(e) => errors.extend(e),
            }
        }
        if errors.is_empty() { Ok(out) } else { Err(errors) }
    }
}

/// Everything the intent page posts, cleaned together so all errors surface at once.
#[derive(Debug, Clone)]
pub struct IntentSubmission {
    pub form: IntentForm,
    pub conditions_in: Vec<Condition>,
    pub variables: Vec<IntentVariable>,
    pub context_in: BTreeMap<String, String>,
    pub context_out: BTreeMap<String, String>,
}

impl IntentSubmission {
    pub fn parse(
        data: &FormData,
        available_entities: &[String],
        delimiter: &str,
    ) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::default();
        let form = take(IntentForm::parse(data, delimiter), &mut errors);
        let conditions_in = take(ConditionsFormset::parse(data), &mut errors);
        let variables = take(
            EntityFormset::parse(data, available_entities, delimiter),
            &mut errors,
        );
        let context_in = take(
            ContextFormset::parse(data, ContextFormset::IN_PREFIX),
            &mut errors,
        );
        let context_out = take(
            ContextFormset::parse(data, ContextFormset::OUT_PREFIX),
            &mut errors,
        );

        match (form, conditions_in, variables, context_in, context_out) {
            (Some(form), Some(conditions_in), Some(variables), Some(context_in), Some(context_out)) => {
                Ok(Self {
                    form,
                    conditions_in,
                    variables,
                    context_in,
                    context_out,
                })
            }
            _ => Err(errors),
        }
    }

    pub fn payload(self) -> Value {
        self.form.payload(
            self.conditions_in,
            self.variables,
            self.context_in,
            self.context_out,
        )
    }
}

fn take<T>(result: Result<T, FormErrors>, errors: &mut FormErrors) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            errors.extend(e);
            None
        }
    }
}

type Row = BTreeMap<String, String>;

/// Field values of the intent page, as the template renders them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntentRows {
    pub values: Row,
    pub conditions: Vec<Row>,
    pub entities: Vec<Row>,
    pub context_in: Vec<Row>,
    pub context_out: Vec<Row>,
}

impl IntentRows {
    /// Initial values from an existing intent.
    pub fn from_intent(intent: &Intent, delimiter: &str) -> Self {
        let row = |pairs: &[(&str, String)]| -> Row {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect()
        };
        let context_rows = |map: &BTreeMap<String, String>| -> Vec<Row> {
            map.iter()
                .map(|(k, v)| row(&[("variable", k.clone()), ("value", v.clone())]))
                .collect()
        };
        let flag = |b: bool| if b { "on".to_string() } else { String::new() };

        Self {
            values: row(&[
                ("intent_name", intent.intent_name.clone()),
                ("user_says", join_tokens(&intent.user_says, delimiter)),
                ("responses", join_tokens(&intent.responses, delimiter)),
                ("webhook", intent.webhook_endpoint().to_string()),
            ]),
            conditions: intent
                .conditions_in
                .iter()
                .map(|c| {
                    row(&[
                        ("variable", c.variable.clone()),
                        ("operator", c.operator.clone()),
                        ("value", c.value.clone()),
                    ])
                })
                .collect(),
            entities: intent
                .variables
                .iter()
                .map(|v| {
                    row(&[
                        ("entity_name", v.entity_name.clone()),
                        ("required", flag(v.required)),
                        ("n_prompts", v.n_prompts.to_string()),
                        ("prompts", join_tokens(&v.prompts, delimiter)),
                        ("value", v.value.clone()),
                        ("label", v.label.clone()),
                        ("lifetime_turns", v.lifetime_turns.to_string()),
                        ("persistent", flag(v.persistent)),
                    ])
                })
                .collect(),
            context_in: context_rows(&intent.context_in),
            context_out: context_rows(&intent.context_out),
        }
    }

    /// Submitted values, for re-rendering after a validation error.
    pub fn from_data(data: &FormData) -> Self {
        let rows = |prefix: &str, fields: &[&str], checkboxes: &[&str]| -> Vec<Row> {
            live_rows(data, prefix, fields)
                .into_iter()
                .map(|i| {
                    fields
                        .iter()
                        .chain(checkboxes)
                        .map(|f| (f.to_string(), data.text(&format!("{prefix}-{i}-{f}"))))
                        .collect()
                })
                .collect()
        };

        Self {
            values: ["intent_name", "user_says", "responses", "webhook"]
                .iter()
                .map(|f| (f.to_string(), data.text(f)))
                .collect(),
            conditions: rows(ConditionsFormset::PREFIX, ConditionsFormset::FIELDS, &[]),
            entities: rows(
                EntityFormset::PREFIX,
                EntityFormset::FIELDS,
                &["required", "persistent"],
            ),
            context_in: rows(ContextFormset::IN_PREFIX, ContextFormset::FIELDS, &[]),
            context_out: rows(ContextFormset::OUT_PREFIX, ContextFormset::FIELDS, &[]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DELIM: &str = ",";

    fn data(pairs: &[(&str, &str)]) -> FormData {
        FormData::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("intent_name", "greet"),
            ("user_says", "hi,hello"),
            ("responses", "hey there"),
        ]
    }

    #[test]
    fn webhook_is_enabled_only_with_an_endpoint() {
        let form = IntentForm::parse(&data(&base()), DELIM).unwrap();
        assert!(!form.webhook.enabled);
        assert_eq!(form.webhook.intent_name, "greet");

        let mut fields = base();
        fields.push(("webhook", "https://hooks.example.com/greet"));
        let form = IntentForm::parse(&data(&fields), DELIM).unwrap();
        assert!(form.webhook.enabled);
        assert_eq!(form.webhook.endpoint, "https://hooks.example.com/greet");
    }

    #[test]
    fn invalid_webhook_is_a_field_error() {
        let mut fields = base();
        fields.push(("webhook", "not a url"));
        let errors = IntentForm::parse(&data(&fields), DELIM).unwrap_err();
        assert!(errors.has("webhook"));
    }

    #[test]
    fn deleted_and_blank_rows_are_skipped() {
        let form = data(&[
            ("CONDITIONS-TOTAL_FORMS", "3"),
            ("CONDITIONS-0-variable", "city"),
            ("CONDITIONS-0-operator", "SET"),
            ("CONDITIONS-1-variable", "age"),
            ("CONDITIONS-1-operator", "EQUALS"),
            ("CONDITIONS-1-value", "3"),
            ("CONDITIONS-1-DELETE", "on"),
        ]);
        let conditions = ConditionsFormset::parse(&form).unwrap();
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].variable, "city");
        assert_eq!(conditions[0].value, "");
    }

    #[test]
    fn conditions_validate_operator_and_value() {
        let form = data(&[
            ("CONDITIONS-0-variable", "x"),
            ("CONDITIONS-0-operator", "LIKE"),
            ("CONDITIONS-1-variable", "y"),
            ("CONDITIONS-1-operator", "EQUALS"),
        ]);
        let errors = ConditionsFormset::parse(&form).unwrap_err();
        assert!(errors.has("CONDITIONS-0-operator"));
        assert!(errors.has("CONDITIONS-1-value"));
    }

    #[test]
    fn entity_rows_check_choices_and_prompt_count() {
        let available = vec!["city".to_string(), "sys.date".to_string()];
        let form = data(&[
            ("ENTITIES-TOTAL_FORMS", "2"),
            ("ENTITIES-0-entity_name", "city"),
            ("ENTITIES-0-required", "on"),
            ("ENTITIES-0-n_prompts", "3"),
            ("ENTITIES-0-prompts", "Which city?,Where?"),
            ("ENTITIES-1-entity_name", "planet"),
            ("ENTITIES-1-n_prompts", "17"),
        ]);
        let errors = EntityFormset::parse(&form, &available, DELIM).unwrap_err();
        assert!(errors.has("ENTITIES-1-entity_name"));
        assert!(errors.has("ENTITIES-1-n_prompts"));
        assert!(!errors.has("ENTITIES-0-entity_name"));

        let ok = data(&[
            ("ENTITIES-0-entity_name", "city"),
            ("ENTITIES-0-n_prompts", "3"),
            ("ENTITIES-0-prompts", "Which city?"),
        ]);
        let vars = EntityFormset::parse(&ok, &available, DELIM).unwrap();
        assert_eq!(vars[0].n_prompts, 3);
        assert_eq!(vars[0].lifetime_turns, DEFAULT_LIFETIME_TURNS);
        assert!(!vars[0].required);
    }

    #[test]
    fn submission_stitches_one_payload() {
        let mut fields = base();
        fields.extend([
            ("webhook", "https://hooks.example.com/greet"),
            ("CONTEXT_IN-0-variable", "user"),
            ("CONTEXT_IN-0-value", "known"),
            ("CONTEXT_OUT-0-variable", "greeted"),
            ("CONTEXT_OUT-0-value", "yes"),
            ("CONDITIONS-0-variable", "user"),
            ("CONDITIONS-0-operator", "SET"),
        ]);
        let payload = IntentSubmission::parse(&data(&fields), &[], DELIM)
            .unwrap()
            .payload();

        assert_eq!(payload["intent_name"], json!("greet"));
        assert_eq!(payload["user_says"], json!(["hi", "hello"]));
        assert_eq!(
            payload["webhook"],
            json!({"intent_name": "greet", "endpoint": "https://hooks.example.com/greet", "enabled": true})
        );
        assert_eq!(payload["context_in"], json!({"user": "known"}));
        assert_eq!(payload["context_out"], json!({"greeted": "yes"}));
        assert_eq!(payload["conditions_in"][0]["operator"], json!("SET"));
        assert_eq!(payload["variables"], json!([]));
    }

    #[test]
    fn submission_reports_errors_from_every_part() {
        let form = data(&[
            ("intent_name", "bad name"),
            ("CONTEXT_IN-0-value", "orphan"),
        ]);
        let errors = IntentSubmission::parse(&form, &[], DELIM).unwrap_err();
        assert!(errors.has("intent_name"));
        assert!(errors.has("user_says"));
        assert!(errors.has("CONTEXT_IN-0-variable"));
    }

    #[test]
    fn rows_from_intent_join_tokens() {
        let intent: Intent = serde_json::from_value(json!({
            "intent_name": "greet",
            "user_says": ["hi", "hello"],
            "responses": ["hey"],
            "webhook": null,
            "context_out": {"greeted": "yes"}
        }))
        .unwrap();
        let rows = IntentRows::from_intent(&intent, DELIM);
        assert_eq!(rows.values["user_says"], "hi,hello");
        assert_eq!(rows.values["webhook"], "");
        assert_eq!(rows.context_out[0]["variable"], "greeted");
    }
}
