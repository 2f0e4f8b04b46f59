pub mod document;
pub mod included;
pub mod resource;

pub use document::{Document, ListContext, Links, Meta, PageOffsets, PaginationLinks, Serializer};
pub use included::{dedup_included, extract_included};
pub use resource::{Relationship, RelationshipLinks, ResourceIdentifierObject, ResourceObject};
