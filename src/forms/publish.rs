use super::{Cleaner, FormData, FormErrors};
use crate::api::UploadedFile;
use crate::services::botstore::STORE_CATEGORIES;

pub const LICENSE_TYPES: &[&str] = &["Free", "Subscription", "Perpetual"];
pub const ICON_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
pub const MAX_ICON_BYTES: usize = 512_000;
pub const MAX_PRICE: f64 = 1000.0;

pub const CLASSIFICATION: &str = "Everyone";
pub const VERSION: &str = "1";

/// A bot listing submitted to the store.
#[derive(Debug, Clone)]
pub struct PublishForm {
    pub name: String,
    pub description: String,
    pub long_description: String,
    pub sample: String,
    pub icon: UploadedFile,
    pub license_type: String,
    pub category: String,
    pub price: f64,
    pub privacy_policy: String,
    pub alert_message: String,
    pub video_link: String,
    pub badge: String,
}

impl PublishForm {
    pub fn parse(data: &FormData) -> Result<Self, FormErrors> {
        let mut c = Cleaner::new(data);

        let name = c.required("name");
        c.max_len("name", &name, 50);
        let description = c.required("description");
        c.max_len("description", &description, 250);
        let long_description = c.required("longDescription");
        let sample = c.required("sample");

        let icon = c.file("icon");
        if let Some(icon) = &icon {
            let ext_ok = icon
                .extension()
                .is_some_and(|ext| ICON_EXTENSIONS.contains(&ext.as_str()));
            if !ext_ok {
                c.error("icon", "Upload a JPG or PNG image.");
            }
            if icon.len() > MAX_ICON_BYTES {
                c.error(
                    "icon",
                    format!("The icon must be at most {} KB.", MAX_ICON_BYTES / 1000),
                );
            }
        }

        let license_type = c.required("licenseType");
        c.choice("licenseType", &license_type, LICENSE_TYPES);
        let category = c.required("category");
        c.choice("category", &category, &STORE_CATEGORIES);

        let price = c.float_range("price", true, 0.0, MAX_PRICE).unwrap_or(0.0);

        let privacy_policy = c.required("privacyPolicy");
        c.url("privacyPolicy", &privacy_policy);

        let alert_message = c.optional("alertMessage");
        c.max_len("alertMessage", &alert_message, 150);
        let video_link = c.optional("videoLink");
        c.url("videoLink", &video_link);
        let badge = c.optional("badge");

        match icon {
            Some(icon) => c.finish(Self {
                name,
                description,
                long_description,
                sample,
                icon,
                license_type,
                category,
                price,
                privacy_policy,
                alert_message,
                video_link,
                badge,
            }),
            None => Err(c.into_errors()),
        }
    }

    /// Listing fields for `POST /botstore`; the icon goes up separately.
    pub fn to_form(&self) -> Vec<(String, String)> {
        [
            ("name", self.name.clone()),
            ("description", self.description.clone()),
            ("longDescription", self.long_description.clone()),
            ("sample", self.sample.clone()),
            ("licenseType", self.license_type.clone()),
            ("category", self.category.clone()),
            ("price", self.price.to_string()),
            ("privacyPolicy", self.privacy_policy.clone()),
            ("alertMessage", self.alert_message.clone()),
            ("videoLink", self.video_link.clone()),
            ("badge", self.badge.clone()),
            ("classification", CLASSIFICATION.to_string()),
            ("version", VERSION.to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}
