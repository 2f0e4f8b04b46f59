//! Request documents for create/update and attribute validation rules.

pub mod body;
mod validation;

pub use body::{parse_create, parse_update};
pub use validation::RequestValidator;
