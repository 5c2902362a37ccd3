//! JSON-RNC: a compact schema notation compiled to JSON Schema, and a validator
//! for streams of JSON records.
//!
//! ```text
//! source ─ token ─ compile ─▶ SchemaDocument ─ validate(value) ─▶ [Diagnostic]
//!                               │        ▲
//!                          emit ▼        │ lift
//!                           JSON-Schema document (cache)
//! ```
pub mod cache;
pub mod cli;
pub mod compile;
pub mod diag;
pub mod emit;
pub mod error;
pub mod ir;
pub mod path_de;
pub mod pretty;
pub mod record;
pub mod report;
pub mod split;
pub mod stream;
pub mod token;
pub mod validate;

pub use compile::{compile, CompileDiagnostic, CompileErrors};
pub use diag::Diagnostic;
pub use error::{Result, RncError};
pub use ir::{SchemaDocument, SchemaNode};
pub use validate::{validate, Validator};
