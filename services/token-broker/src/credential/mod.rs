//! Root credential persistence and validation.

pub mod model;
pub mod store;

pub use model::{ConfigureRequest, CredentialView, RootCredential, TokenExpiration};
pub use store::CredentialStore;
