use bytes::Bytes;
use serde_json::Value;

use super::{Cleaner, FormData, FormErrors, NAME_RE};
use crate::api::UploadedFile;

pub const MAX_SKILLS: usize = 5;

pub const VOICES: &[&str] = &["0", "1"];
pub const PERSONALITIES: &[&str] = &["0", "1"];

/// Timezones offered by the bot forms.
pub const TIMEZONES: &[&str] = &[
    "UTC",
    "Africa/Cairo",
    "Africa/Johannesburg",
    "Africa/Lagos",
    "America/Anchorage",
    "America/Argentina/Buenos_Aires",
    "America/Bogota",
    "America/Chicago",
    "America/Denver",
    "America/Halifax",
    "America/Los_Angeles",
    "America/Mexico_City",
    "America/New_York",
    "America/Phoenix",
    "America/Sao_Paulo",
    "America/Toronto",
    "America/Vancouver",
    "Asia/Bangkok",
    "Asia/Dubai",
    "Asia/Hong_Kong",
    "Asia/Jakarta",
    "Asia/Jerusalem",
    "Asia/Kolkata",
    "Asia/Manila",
    "Asia/Seoul",
    "Asia/Shanghai",
    "Asia/Singapore",
    "Asia/Tokyo",
    "Atlantic/Reykjavik",
    "Australia/Adelaide",
    "Australia/Brisbane",
    "Australia/Perth",
    "Australia/Sydney",
    "Europe/Amsterdam",
    "Europe/Athens",
    "Europe/Berlin",
    "Europe/Dublin",
    "Europe/Istanbul",
    "Europe/Lisbon",
    "Europe/London",
    "Europe/Madrid",
    "Europe/Moscow",
    "Europe/Paris",
    "Europe/Rome",
    "Europe/Stockholm",
    "Europe/Warsaw",
    "Europe/Zurich",
    "Pacific/Auckland",
    "Pacific/Honolulu",
];

const NAME_MESSAGE: &str =
    "Use only letters, numbers, spaces, hyphens and underscores.";

/// Name, description, voice, timezone and default responses of a bot.
#[derive(Debug, Clone, PartialEq)]
pub struct AddAiForm {
    pub name: String,
    pub description: String,
    pub voice: String,
    pub timezone: String,
    pub default_chat_responses: Vec<String>,
}

/// Cloning posts exactly the fields of a new bot.
pub type CloneAiForm = AddAiForm;

impl AddAiForm {
    pub fn parse(data: &FormData, delimiter: &str) -> Result<Self, FormErrors> {
        let mut c = Cleaner::new(data);
        let form = Self::clean(&mut c, delimiter);
        c.finish(form)
    }

    fn clean(c: &mut Cleaner<'_>, delimiter: &str) -> Self {
        let name = c.required("name");
        c.max_len("name", &name, 50);
        c.pattern("name", &name, &NAME_RE, NAME_MESSAGE);

        let description = c.optional("description");
        c.max_len("description", &description, 250);

        let mut voice = c.optional("voice");
        if voice.is_empty() {
            voice = "0".to_string();
        }
        c.choice("voice", &voice, VOICES);

        let timezone = c.required("timezone");
        c.choice("timezone", &timezone, TIMEZONES);

        let default_chat_responses = c.tokens("default_chat_responses", delimiter, false);

        Self {
            name,
            description,
            voice,
            timezone,
            default_chat_responses,
        }
    }

    /// Upstream form pairs; token lists repeat their key.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("name".to_string(), self.name.clone()),
            ("description".to_string(), self.description.clone()),
            ("voice".to_string(), self.voice.clone()),
            ("timezone".to_string(), self.timezone.clone()),
        ];
        pairs.extend(
            self.default_chat_responses
                .iter()
                .map(|r| ("default_chat_responses".to_string(), r.clone())),
        );
        pairs
    }
}

/// Everything in [`AddAiForm`] plus the tuning knobs of an existing bot.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsAiForm {
    pub base: AddAiForm,
    pub confidence: f64,
    pub personality: String,
    /// Entered in minutes, stored in seconds.
    pub handover_reset_timeout_seconds: i64,
    pub error_threshold_handover: i64,
    pub handover_message: String,
}

impl SettingsAiForm {
    pub fn parse(data: &FormData, delimiter: &str) -> Result<Self, FormErrors> {
        let mut c = Cleaner::new(data);
        let base = AddAiForm::clean(&mut c, delimiter);

        let confidence = c.float_range("confidence", true, 0.0, 1.0).unwrap_or(0.4);

        let mut personality = c.optional("personality");
        if personality.is_empty() {
            personality = "0".to_string();
        }
        c.choice("personality", &personality, PERSONALITIES);

        let minutes = c
            .int_range("handover_reset_timeout", false, 0, i64::MAX / 60)
            .unwrap_or(0);
        let error_threshold_handover = c
            .int_range("error_threshold_handover", false, -1, 10)
            .unwrap_or(-1);

        let handover_message = c.optional("handover_message");
        c.max_len("handover_message", &handover_message, 250);

        c.finish(Self {
            base,
            confidence,
            personality,
            handover_reset_timeout_seconds: minutes * 60,
            error_threshold_handover,
            handover_message,
        })
    }

    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut pairs = self.base.to_form();
        pairs.extend([
            ("confidence".to_string(), self.confidence.to_string()),
            ("personality".to_string(), self.personality.clone()),
            (
                "handover_reset_timeout_seconds".to_string(),
                self.handover_reset_timeout_seconds.to_string(),
            ),
            (
                "error_threshold_handover".to_string(),
                self.error_threshold_handover.to_string(),
            ),
            ("handover_message".to_string(), self.handover_message.clone()),
        ]);
        pairs
    }
}

/// A bot export, re-imported as a new bot or over an existing one.
#[derive(Debug, Clone)]
pub struct ImportAiForm {
    pub document: Bytes,
}

impl ImportAiForm {
    pub const FIELD: &'static str = "ai_data";

    pub fn parse(data: &FormData) -> Result<Self, FormErrors> {
        let mut c = Cleaner::new(data);
        let document = c.file(Self::FIELD).map(|f| f.bytes);
        if let Some(bytes) = &document
            && serde_json::from_slice::<Value>(bytes).is_err()
        {
            c.error(Self::FIELD, "The uploaded file is not valid JSON.");
        }
        c.finish(Self {
            document: document.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct TrainingForm {
    pub file: UploadedFile,
}

impl TrainingForm {
    pub const FIELD: &'static str = "file";

    pub fn parse(data: &FormData) -> Result<Self, FormErrors> {
        let mut c = Cleaner::new(data);
        let file = c.file(Self::FIELD);
        match file {
            Some(file) if std::str::from_utf8(&file.bytes).is_ok() => c.finish(Self { file }),
            Some(_) => {
                c.error(Self::FIELD, "Training files must be plain text.");
                Err(c.into_errors())
            }
            None => Err(c.into_errors()),
        }
    }
}

/// Bulk intent upload (CSV).
#[derive(Debug, Clone)]
pub struct IntentsUploadForm {
    pub file: UploadedFile,
}

impl IntentsUploadForm {
    pub const FIELD: &'static str = "file";

    pub fn parse(data: &FormData) -> Result<Self, FormErrors> {
        let mut c = Cleaner::new(data);
        match c.file(Self::FIELD) {
            Some(file) if file.extension().as_deref() == Some("csv") => c.finish(Self { file }),
            Some(_) => {
                c.error(Self::FIELD, "Upload a CSV file.");
                Err(c.into_errors())
            }
            None => Err(c.into_errors()),
        }
    }
}

/// Purchased skills linked to a bot.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillsForm {
    pub skills: Vec<String>,
}

impl SkillsForm {
    pub fn parse(data: &FormData, choices: &[String]) -> Result<Self, FormErrors> {
        let mut c = Cleaner::new(data);
        let skills: Vec<String> = data
            .get_all("skills")
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if skills.len() > MAX_SKILLS {
            c.error(
                "skills",
                format!("You can select at most {MAX_SKILLS} skills."),
            );
        }
        for skill in &skills {
            if !choices.iter().any(|choice| choice == skill) {
                c.error(
                    "skills",
                    format!("Select a valid choice. {skill} is not one of the available choices."),
                );
            }
        }
        c.finish(Self { skills })
    }

    pub fn to_form(&self) -> Vec<(String, String)> {
        self.skills
            .iter()
            .map(|s| ("skills".to_string(), s.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELIM: &str = "\u{9D}";

    fn data(pairs: &[(&str, &str)]) -> FormData {
        FormData::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn upload(name: &str, body: &'static [u8]) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: None,
            bytes: Bytes::from_static(body),
        }
    }

    #[test]
    fn add_ai_cleans_and_splits_responses() {
        let form = AddAiForm::parse(
            &data(&[
                ("name", "My bot"),
                ("description", "desc"),
                ("voice", "1"),
                ("timezone", "Europe/London"),
                ("default_chat_responses", &format!("Sorry{DELIM}Try again")),
            ]),
            DELIM,
        )
        .unwrap();
        assert_eq!(form.default_chat_responses, vec!["Sorry", "Try again"]);

        let pairs = form.to_form();
        assert_eq!(
            pairs
                .iter()
                .filter(|(k, _)| k == "default_chat_responses")
                .count(),
            2
        );
    }

    #[test]
    fn add_ai_rejects_bad_names_and_timezones() {
        let errors = AddAiForm::parse(
            &data(&[("name", "bad!name"), ("timezone", "Mars/Olympus")]),
            DELIM,
        )
        .unwrap_err();
        assert!(errors.has("name"));
        assert!(errors.has("timezone"));
    }

    #[test]
    fn settings_converts_minutes_to_seconds() {
        let form = SettingsAiForm::parse(
            &data(&[
                ("name", "bot"),
                ("timezone", "UTC"),
                ("confidence", "0.6"),
                ("personality", "1"),
                ("handover_reset_timeout", "5"),
                ("error_threshold_handover", "3"),
            ]),
            DELIM,
        )
        .unwrap();
        assert_eq!(form.handover_reset_timeout_seconds, 300);
        assert!(
            form.to_form()
                .contains(&("handover_reset_timeout_seconds".to_string(), "300".to_string()))
        );
    }

    #[test]
    fn settings_bounds_confidence_and_threshold() {
        let errors = SettingsAiForm::parse(
            &data(&[
                ("name", "bot"),
                ("timezone", "UTC"),
                ("confidence", "1.5"),
                ("error_threshold_handover", "11"),
            ]),
            DELIM,
        )
        .unwrap_err();
        assert!(errors.has("confidence"));
        assert!(errors.has("error_threshold_handover"));
    }

    #[test]
    fn import_requires_json() {
        let ok = data(&[]).with_file("ai_data", upload("bot.json", br#"{"name":"x"}"#));
        assert!(ImportAiForm::parse(&ok).is_ok());

        let bad = data(&[]).with_file("ai_data", upload("bot.json", b"not json"));
        assert!(ImportAiForm::parse(&bad).unwrap_err().has("ai_data"));

        assert!(ImportAiForm::parse(&data(&[])).unwrap_err().has("ai_data"));
    }

    #[test]
    fn training_requires_a_text_file() {
        let ok = data(&[]).with_file("file", upload("train.txt", b"hi\nhello"));
        assert!(TrainingForm::parse(&ok).is_ok());

        let binary = data(&[]).with_file("file", upload("train.txt", &[0xff, 0xfe, 0x00]));
        assert!(TrainingForm::parse(&binary).is_err());
    }

    #[test]
    fn skills_are_limited_and_checked() {
        let choices: Vec<String> = (1..=7).map(|i| i.to_string()).collect();
        let picked: Vec<(String, String)> = (1..=6)
            .map(|i| ("skills".to_string(), i.to_string()))
            .collect();
        assert!(SkillsForm::parse(&FormData::new(picked), &choices).is_err());

        let errors = SkillsForm::parse(&data(&[("skills", "99")]), &choices).unwrap_err();
        assert!(errors.has("skills"));

        let form = SkillsForm::parse(&data(&[("skills", "2"), ("skills", "3")]), &choices).unwrap();
        assert_eq!(form.skills, vec!["2", "3"]);
    }
}
