mod api;
mod console;

pub use api::ApiError;
pub use console::{ApiErrorBody, ApiErrorObject, ConsoleError, JsonError};
