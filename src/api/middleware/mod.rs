pub mod auth;
pub mod csrf;
pub mod request_id;

pub use auth::{AuthMethod, AuthenticatedUser, UserAuth};
pub use csrf::CsrfGuard;
pub use request_id::{RequestId, RequestIdMiddleware};
