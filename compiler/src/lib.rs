//! minibuf-compiler
//!
//! This crate implements:
//!  1) A tokenizer + parser for `.mb` schema files,
//!  2) A schema verifier (duplicate schemas and fields, default types, config),
//!  3) Code generation for C, TypeScript and Rust behind the `Emitter` trait,
//!  4) Helpers that write generated code to a directory, for the CLI and build scripts,
//!  5) Error types (`MinibufError`).
//!
//! ```
//! use minibuf_compiler::{compile_schema, Emitter, Target};
//!
//! let set = compile_schema("Point {\n  x: number\n  y: number = 5\n}\n").unwrap();
//! let code = Target::C.emitter().emit(&set);
//! assert!(code.interface.contains("} point_t;"));
//! assert!(code.implementation.contains("int mb_point_parse(const char* buf, point_t* out) {"));
//! ```

pub mod error;
pub mod utils;
pub mod tokenizer;
pub mod parser;
pub mod verifier;
pub mod compiler;
pub mod traits;
pub mod gen_c;
pub mod gen_ts;
pub mod gen_rust;
pub mod build;

pub use compiler::{compile_files, compile_schema, compile_sources, expand_paths, load_sources, Source};
pub use error::MinibufError;
pub use traits::{Emitter, GeneratedCode, GeneratedFile, Target};
pub use minibuf_schema::SchemaSet;
