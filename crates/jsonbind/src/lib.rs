//! Bidirectional JSON databinding: documents to registered Rust types and
//! back, driven by naming-convention property descriptors, path-based type
//! hints and pluggable converters.
//!
//! ```
//! use std::sync::Arc;
//!
//! use jsonbind::{Generator, Parser, TypeRegistry, Value};
//!
//! let registry = Arc::new(TypeRegistry::new());
//! let parser = Parser::new(Arc::clone(&registry));
//! let value = parser.parse_str(r#"{"answer": 42}"#)?;
//! assert_eq!(value.as_object().unwrap()["answer"], Value::Integer(42));
//!
//! let round = Generator::new(registry).generate(&value)?;
//! assert_eq!(round, r#"{"answer":42}"#);
//! # Ok::<(), jsonbind::Error>(())
//! ```

mod binding;
mod convert;
mod descriptor;
mod hints;
mod matcher;
mod path;
mod token;
mod value;

mod error;
mod generator;
mod options;
mod parser;
mod refs;
mod registry;
mod source;
mod tokenizer;

#[cfg(test)]
mod tests;

pub use binding::{BindingBuilder, ParamDecl, PropertyConfig, TypeBinding};
pub use convert::{ConverterRef, ConverterRegistry, DateConverter, TypeConverter};
pub use descriptor::{ClassDescriptor, PropertyDescriptor};
pub use error::{
    AccessError, ConfigError, ConvertError, Error, LexError, LexErrorKind, ParseError, Result,
};
pub use generator::Generator;
pub use hints::{HintRules, Target, TypeHintRule, TypeToken};
pub use matcher::{PathMatcher, TypeQuery};
pub use options::{ParserOptions, TokenizerOptions};
pub use parser::Parser;
pub use path::ParsePath;
pub use registry::TypeRegistry;
pub use source::{CharSource, ReaderSource, StrSource};
pub use token::{Token, TokenType};
pub use tokenizer::Tokenizer;
pub use value::{Array, Map, ObjHandle, Value};
