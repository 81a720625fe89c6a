pub mod admin;
pub mod login;

pub use admin::RequireAdminKey;
pub use login::{LoggedIn, LoggedInJson};
