pub mod convert;
pub mod decoder;
pub mod emit;
pub mod error;
pub mod fetch;
pub mod group;
pub mod node;
pub mod normalizer;
pub mod parser;
pub mod ruleset;
pub mod settings;
pub mod utils;

#[cfg(feature = "web-api")]
pub mod api;

pub use convert::{convert, ConvertRequest, ConvertResult, Target};
pub use error::{ConfigError, Diagnostic, FetchError, ParseError, TemplateError};
pub use node::{NodeDescriptor, NodeType};
