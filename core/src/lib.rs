#![deny(clippy::all)]

mod import_cache;
mod loader;
mod logger;
mod parser;
mod types;
mod url;
mod utils;

pub use import_cache::*;
pub use loader::*;
pub use logger::*;
pub use parser::*;
pub use types::*;
pub use url::*;
