// Protocol Template
// Data models and YAML parser for the step + placeholder processing template

pub mod error;
pub mod models;
pub mod parser;

pub use error::ParseError;
pub use models::{Blueprint, ProtocolStep, ProtocolTemplate};
pub use parser::TemplateParser;
