// Library exports for binaries and tests
pub mod closure;
pub mod cms;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod normalize;
pub mod orchestrator;
pub mod server;
pub mod translation;
pub mod translation_key;
pub mod validator;
pub mod write_back;

pub use error::{Error, Result};
pub use orchestrator::{run_translation, TranslationJob, TranslationReport};
