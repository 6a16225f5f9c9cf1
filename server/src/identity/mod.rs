pub mod service;

pub use service::{ExternalLogin, IdentityService, RegisteredUser};
