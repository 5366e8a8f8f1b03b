//! A parameterisable CRC toolkit and C source-code generator
//!
//! Two entry points: [`crc`] computes a checksum directly; [`emit`] expands
//! one of the C source templates for a given model. Everything else (the
//! reference algorithms, the boolean minimiser, the template lexer/parser,
//! the symbol table) is plumbing in service of those two.

pub mod bitwise;
pub mod driver;
pub mod error;
pub mod kernel;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod qm;
pub mod symtable;

pub use driver::{emit, Action};
pub use error::{CrcError, InconsistentAlgorithms, ModelError, ParseError};
pub use kernel::{crc, cross_check, Algorithm};
pub use model::{Model, ModelBuilder, TableIdxWidth};
pub use symtable::CStd;
