pub mod builders;
pub mod config;
pub mod context;
pub mod data;
pub mod datasource;
pub mod fs;
pub mod globals;
pub mod requesters;

pub mod error;

pub use context::Context;
pub use data::Response;
pub use datasource::{DataSource, parse_data_source, read_data_source, request};
pub use error::{DatasourceError, Result};
pub use requesters::Registry;
