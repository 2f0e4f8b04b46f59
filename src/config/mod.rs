pub mod app;
pub mod types;
pub mod loader;
pub mod validator;
pub mod resolved;
#[cfg(test)]
pub(crate) mod fixtures;

pub use app::*;
pub use types::*;
pub use loader::*;
pub use validator::*;
pub use resolved::*;
