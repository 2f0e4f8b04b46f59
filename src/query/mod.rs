pub mod include;
pub mod page;
pub mod request;
pub mod sort;

pub use include::{IncludeDirective, IncludeNode};
pub use page::{Pagination, DEFAULT_LIMIT};
pub use request::{validate_include, GetListRequest, QuerySpec};
pub use sort::{Direction, Order};
