use botstudio_schema::DeveloperInfo;

use super::{Cleaner, FormData, FormErrors};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PERSON_NAME_LEN: usize = 64;

const DOMAIN_NOT_ALLOWED: &str = "Your email domain is not allowed";

#[derive(Debug, Clone, PartialEq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn parse(data: &FormData) -> Result<Self, FormErrors> {
        let mut c = Cleaner::new(data);
        let email = c.required("email");
        // Passwords are taken verbatim.
        let password = data.get("password").unwrap_or_default().to_string();
        if password.is_empty() {
            c.error("password", super::REQUIRED);
        }
        c.finish(Self { email, password })
    }
}

/// Uniqueness of the email is checked against the account store by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl SignupForm {
    pub fn parse(data: &FormData, allowed_domains: &[String]) -> Result<Self, FormErrors> {
        let mut c = Cleaner::new(data);

        let email = c.required("email").to_lowercase();
        c.email("email", &email);
        if !email.is_empty() && !domain_allowed(&email, allowed_domains) {
            c.error("email", DOMAIN_NOT_ALLOWED);
        }

        let password = data.get("password").unwrap_or_default().to_string();
        if password.is_empty() {
            c.error("password", super::REQUIRED);
        } else {
            c.min_len("password", &password, MIN_PASSWORD_LEN);
        }

        let first_name = c.required("first_name");
        c.max_len("first_name", &first_name, MAX_PERSON_NAME_LEN);
        let last_name = c.required("last_name");
        c.max_len("last_name", &last_name, MAX_PERSON_NAME_LEN);

        if !c.checkbox("agree") {
            c.error("agree", "You must agree to the terms of service.");
        }

        c.finish(Self {
            email,
            password,
            first_name,
            last_name,
        })
    }
}

/// An empty allowlist admits every domain.
pub fn domain_allowed(email: &str, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    email
        .rsplit_once('@')
        .is_some_and(|(_, domain)| allowed.iter().any(|d| d.eq_ignore_ascii_case(domain)))
}

/// Publisher details required before the first store listing.
pub struct DeveloperInfoForm;

impl DeveloperInfoForm {
    pub fn parse(data: &FormData) -> Result<DeveloperInfo, FormErrors> {
        let mut c = Cleaner::new(data);

        let name = c.required("name");
        c.max_len("name", &name, 100);
        let email = c.required("email");
        c.email("email", &email);
        let address = c.required("address");
        let post_code = c.required("postCode");
        c.max_len("postCode", &post_code, 20);
        let city = c.required("city");
        let country = c.required("country");
        let website = c.required("website");
        c.url("website", &website);
        let company = c.required("company");

        c.finish(DeveloperInfo {
            name,
            email,
            address,
            post_code,
            city,
            country,
            website,
            company,
        })
    }

    pub fn to_form(info: &DeveloperInfo) -> Vec<(String, String)> {
        [
            ("name", &info.name),
            ("email", &info.email),
            ("address", &info.address),
            ("postCode", &info.post_code),
            ("city", &info.city),
            ("country", &info.country),
            ("website", &info.website),
            ("company", &info.company),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> FormData {
        FormData::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn signup_fields(email: &str) -> Vec<(&str, &str)> {
        vec![
            ("email", email),
            ("password", "correct horse"),
            ("first_name", "Ada"),
            ("last_name", "Lovelace"),
            ("agree", "on"),
        ]
    }

    #[test]
    fn signup_accepts_a_complete_form() {
        let form = SignupForm::parse(&data(&signup_fields("Ada@Example.com")), &[]).unwrap();
        assert_eq!(form.email, "ada@example.com");
    }

    #[test]
    fn signup_enforces_domain_allowlist() {
        let allowed = vec!["example.com".to_string()];
        let errors =
            SignupForm::parse(&data(&signup_fields("ada@other.org")), &allowed).unwrap_err();
        assert_eq!(
            errors.get("email"),
            Some(&["Your email domain is not allowed".to_string()][..])
        );
        assert!(SignupForm::parse(&data(&signup_fields("ada@example.com")), &allowed).is_ok());
    }

    #[test]
    fn signup_checks_password_and_agreement() {
        let errors = SignupForm::parse(
            &data(&[
                ("email", "ada@example.com"),
                ("password", "short"),
                ("first_name", "Ada"),
                ("last_name", "Lovelace"),
            ]),
            &[],
        )
        .unwrap_err();
        assert!(errors.has("password"));
        assert!(errors.has("agree"));
    }

    #[test]
    fn developer_info_requires_every_field() {
        let errors = DeveloperInfoForm::parse(&data(&[("name", "Ada")])).unwrap_err();
        for field in ["email", "address", "postCode", "city", "country", "website", "company"] {
            assert!(errors.has(field), "{field} should be required");
        }

        let info = DeveloperInfoForm::parse(&data(&[
            ("name", "Ada"),
            ("email", "ada@example.com"),
            ("address", "1 Analytical Way"),
            ("postCode", "N1 1AA"),
            ("city", "London"),
            ("country", "United Kingdom"),
            ("website", "https://example.com"),
            ("company", "Engines Ltd"),
        ]))
        .unwrap();
        assert_eq!(info.post_code, "N1 1AA");
        assert!(
            DeveloperInfoForm::to_form(&info)
                .contains(&("postCode".to_string(), "N1 1AA".to_string()))
        );
    }

    #[test]
    fn login_needs_both_fields() {
        let errors = LoginForm::parse(&data(&[("email", "a@b.co")])).unwrap_err();
        assert!(errors.has("password"));
    }
}
