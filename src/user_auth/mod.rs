//! User sign-up, login and bearer-token authentication

pub mod handlers;
pub mod middleware;
pub mod service;
pub mod validation;

pub use service::{AuthError, Claims, UserAuthService};
pub use validation::ValidationError;
