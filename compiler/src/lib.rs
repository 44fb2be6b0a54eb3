//! brine-nifxml-compiler
//!
//! This crate implements:
//!  1) A version codec packing dotted format versions into ordinals,
//!  2) An expression engine (partition, parse, evaluate, render) for the
//!     `length`, `width`, `cond` and `vercond` attributes,
//!  3) The type model: basics, enums, bitflags, structs and blocks with their
//!     members, kept in ordered registries,
//!  4) `load` (document tree -> validated `Model`) and the registry verifier,
//!  5) Error types (`NifError`) and the `FieldContext` evaluation trait.

pub mod error;
pub mod types;
pub mod utils;
pub mod version;
pub mod tokenizer;
pub mod expression;
pub mod registry;
pub mod member;
pub mod composite;
pub mod model;
pub mod parser;
pub mod verifier;
pub mod compiler;
pub mod traits;

pub use compiler::{load, load_str, MIN_SCHEMA_VERSION};
pub use composite::{Block, Struct};
pub use error::NifError;
pub use expression::{Expr, RenderOptions, Terminal};
pub use member::Member;
pub use model::{BlockContext, Model};
pub use registry::Registry;
pub use traits::FieldContext;
pub use types::{Basic, Enum, EnumOption, FormatVersion, NativeTypes};
pub use version::VersionOrdinal;
