pub mod args;
pub mod loader;
pub mod schema;
pub mod validator;

pub use args::{parse_datasource_arg, parse_header_args, parse_source_url};
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::ConfigValidator;
