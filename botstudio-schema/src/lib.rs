pub mod ai;
pub mod botstore;
pub mod developer;
pub mod entity;
pub mod intent;
pub mod status;

pub use ai::{Ai, AiDetails, AiSummary, AiTraining};
pub use botstore::{StoreBot, StoreCategory};
pub use developer::DeveloperInfo;
pub use entity::Entity;
pub use intent::{Condition, Intent, IntentVariable, Webhook};
pub use status::ApiStatus;
