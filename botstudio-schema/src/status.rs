use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform envelope carried by every upstream JSON body under `status`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiStatus {
    pub code: u16,
    pub info: String,
}

impl ApiStatus {
    /// Extracts the envelope from a full response body.
    ///
    /// Returns `None` unless `status.code` is a non-zero integer and `status.info` a non-empty
    /// string; a zero code or empty info counts as missing.
    pub fn from_body(body: &Value) -> Option<Self> {
        let status = body.get("status")?.as_object()?;
        let code = status.get("code")?.as_u64().filter(|c| *c != 0)?;
        let info = status
            .get("info")?
            .as_str()
            .filter(|s| !s.is_empty())?
            .to_string();
        Some(Self {
            code: u16::try_from(code).ok()?,
            info,
        })
    }

    /// 200 and 201 are the only codes handlers treat as success.
    pub fn is_success(&self) -> bool {
        matches!(self.code, 200 | 201)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_body_requires_code_and_info() {
        let ok = json!({"status": {"code": 201, "info": "Created"}});
        assert_eq!(
            ApiStatus::from_body(&ok),
            Some(ApiStatus {
                code: 201,
                info: "Created".to_string()
            })
        );

        assert!(ApiStatus::from_body(&json!({})).is_none());
        assert!(ApiStatus::from_body(&json!({"status": {"code": 200}})).is_none());
        assert!(ApiStatus::from_body(&json!({"status": {"info": "OK"}})).is_none());
        assert!(ApiStatus::from_body(&json!({"status": {"code": 0, "info": "OK"}})).is_none());
        assert!(ApiStatus::from_body(&json!({"status": {"code": 200, "info": ""}})).is_none());
        assert!(ApiStatus::from_body(&json!({"status": "OK"})).is_none());
    }

    #[test]
    fn success_is_200_or_201() {
        let status = |code| ApiStatus {
            code,
            info: "x".to_string(),
        };
        assert!(status(200).is_success());
        assert!(status(201).is_success());
        assert!(!status(204).is_success());
        assert!(!status(400).is_success());
    }
}
