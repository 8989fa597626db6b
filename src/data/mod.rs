pub mod merge;
pub mod mime;
pub mod parsers;
pub mod response;

pub use merge::merge_maps;
pub use mime::{mime_alias, mime_type};
pub use response::{Body, Response};
