pub mod extract;
pub mod guards;
pub mod render;
pub mod router;
pub mod routes;
pub mod session;

pub use router::{AppState, botstudio_router};
