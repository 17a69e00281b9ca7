pub mod auth;
pub mod error_code;
pub mod feed;
pub mod groups;
pub mod health;
pub mod helpers;
pub mod media;
pub mod posts;
pub mod profile;
pub mod routes;
pub mod theme;
pub mod types;
pub mod upload;
pub mod users;

pub use error_code::ErrorCode;
pub use health::{AppStartTime, HealthService, health_routes};
pub use helpers::{CookieBuilder, api_result, error_from_agora, error_response, success_response};
pub use media::media_routes;
pub use routes::{api_routes, body_configs};
pub use types::{ApiResponse, MessageResponse};
