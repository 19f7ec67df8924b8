//! Source-text front end: lexer, parser, and `IMPORT` resolution. Turns
//! `.sero` source files into the `RuleDef`/`Term` values `serotonin-core`
//! compiles, the way the teacher keeps its own `compiler` crate's lexer and
//! parser ignorant of codegen.

pub mod lexer;
pub mod loader;
pub mod parser;

pub use loader::Loader;
pub use parser::{parse, ImportDirective, ParsedFile};
