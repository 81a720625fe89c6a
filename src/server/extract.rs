use axum::{
    Form,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};

use crate::api::UploadedFile;
use crate::error::ConsoleError;
use crate::forms::FormData;
use crate::server::router::AppState;

/// Browser form body, urlencoded or multipart, as [`FormData`].
pub struct FormInput(pub FormData);

impl FromRequest<AppState> for FormInput {
    type Rejection = ConsoleError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| ConsoleError::BadRequest(e.body_text()))?;
            return Ok(FormInput(FormData::new(pairs)));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ConsoleError::BadRequest(e.body_text()))?;
        let mut data = FormData::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ConsoleError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ConsoleError::BadRequest(e.body_text()))?;
                    // An untouched file input arrives as an empty, unnamed part.
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    data = data.with_file(
                        &name,
                        UploadedFile {
                            file_name,
                            content_type,
                            bytes,
                        },
                    );
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ConsoleError::BadRequest(e.body_text()))?;
                    data.push(&name, text);
                }
            }
        }
        Ok(FormInput(data))
    }
}
