pub mod config;
pub mod error;
pub mod types;

pub use config::{Credentials, SojournConfig};
pub use error::{Result, SojournError};
pub use types::*;
