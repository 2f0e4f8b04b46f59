//! SQL for model tables. Identifiers come from the resolved schema; values are always bound.

mod builder;
mod params;

pub use builder::*;
pub use params::PgBindValue;
