//! Wires a request to either the CRC kernel or the template engine
//!
//! The compute path (`crc`, re-exported from [`crate::kernel`]) and the
//! codegen path (`emit`, here) are the only two entry points the core
//! exposes; everything else is an implementation detail of one or the
//! other.

use crate::error::CrcError;
use crate::kernel::Algorithm;
use crate::model::Model;
use crate::parser;
use crate::symtable::{CStd, SymbolTable};

/// Which piece of generated C source a codegen request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    GenerateH,
    GenerateC,
    GenerateCMain,
    GenerateTable,
}

/// Expands the template named by `action` against a symbol table seeded
/// from `m`, using `algorithm` for the emitted update routine and `c_std`
/// for type/boolean spelling.
pub fn emit(m: &Model, action: Action, algorithm: Algorithm, c_std: CStd) -> Result<String, CrcError> {
    let symtable = SymbolTable::new(m.clone(), algorithm, c_std);
    let text = match action {
        Action::GenerateH => parser::expand(&symtable, &symtable.get("h_template")?)?,
        Action::GenerateC => parser::expand(&symtable, &symtable.get("c_template")?)?,
        Action::GenerateCMain => {
            let c = parser::expand(&symtable, &symtable.get("c_template")?)?;
            let main = parser::expand(&symtable, &symtable.get("main_template")?)?;
            format!("{}\n\n{}", c, main)
        }
        Action::GenerateTable => parser::expand(&symtable, &symtable.get("crc_table_init")?)?,
    };
    Ok(text)
}
