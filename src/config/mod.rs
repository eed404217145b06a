//! App, service and server configuration: builder types, env loading, and value checks.

pub mod loader;
pub mod types;
pub mod validator;

pub use loader::*;
pub use types::*;
pub use validator::*;
