pub mod auth;
pub mod compact;
pub mod credential;
pub mod error;

pub use auth::{AuthManager, OAuthConfig, TokenResponse};
pub use credential::{Credential, TokenStore};
pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;
