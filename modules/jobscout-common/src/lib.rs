pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, RolesFile, SearchSettings};
pub use error::ScoutError;
pub use types::*;
