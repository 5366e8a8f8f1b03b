//! CRC bitwise-expression formatter
//!
//! Treats one table-driven CRC step as a boolean function of its inputs
//! (the current register bits and the incoming index bits) and minimises
//! that function with [`crate::qm`], producing the same result as
//! [`crate::kernel::table_driven`] without ever materialising a table.

use std::collections::HashSet;

use crate::error::ModelError;
use crate::kernel::{gen_table, reflect};
use crate::model::Model;
use crate::qm::{self, Term};

/// One output bit of a table-driven step, as a minimised boolean term over
/// the index's bits (MSB first, `table_idx_width` bits wide)
#[derive(Debug, Clone)]
pub struct BitExpression {
    pub bit: usize,
    pub terms: HashSet<Term>,
}

/// Minimises every output bit of the `table_idx_width`-wide lookup table,
/// one [`BitExpression`] per register bit, MSB first
pub fn minimise_table(m: &Model) -> Result<Vec<BitExpression>, ModelError> {
    let table = gen_table(m)?;
    let t_bits = m.table_idx_width.bits();
    let width = m.width.ok_or(ModelError::MissingParameter("width"))?;

    let mut exprs = Vec::with_capacity(width);
    for bit in 0..width {
        let bit_from_msb = width - 1 - bit;
        let ones: Vec<u128> = (0..table.len() as u128)
            .filter(|&i| (table[i as usize] >> bit_from_msb) & 1 != 0)
            .collect();
        let terms = qm::simplify(t_bits, &ones, &[]);
        exprs.push(BitExpression { bit: bit_from_msb, terms });
    }
    Ok(exprs)
}

/// Evaluates a minimised bit expression against a concrete `t_bits`-wide
/// index, MSB first, matching the term encoding used by [`minimise_table`]
fn term_matches(term: &str, bits: &[bool]) -> bool {
    let mut has_xor = false;
    let mut xor_parity = false;
    let mut has_xnor = false;
    let mut xnor_parity = false;
    for (c, &b) in term.chars().zip(bits.iter()) {
        match c {
            '0' => {
                if b {
                    return false;
                }
            }
            '1' => {
                if !b {
                    return false;
                }
            }
            '-' => {}
            '^' => {
                has_xor = true;
                xor_parity ^= b;
            }
            '~' => {
                has_xnor = true;
                xnor_parity ^= b;
            }
            _ => unreachable!("invalid term character"),
        }
    }
    (!has_xor || xor_parity) && (!has_xnor || !xnor_parity)
}

fn eval_terms(terms: &HashSet<Term>, index: u128, t_bits: usize) -> bool {
    let bits: Vec<bool> = (0..t_bits)
        .rev()
        .map(|k| (index >> k) & 1 != 0)
        .collect();
    terms.iter().any(|term| term_matches(term, &bits))
}

/// Evaluates one table entry from its minimised expressions, the same
/// value [`crate::kernel::gen_table`] would place at `index`
pub fn table_entry_via_expression(m: &Model, index: usize) -> Result<u128, ModelError> {
    let exprs = minimise_table(m)?;
    let t_bits = m.table_idx_width.bits();
    let mut v: u128 = 0;
    for e in &exprs {
        if eval_terms(&e.terms, index as u128, t_bits) {
            v |= 1 << e.bit;
        }
    }
    Ok(v)
}

/// Computes a CRC the same way [`crate::kernel::table_driven`] does, but
/// resolving each table lookup through the minimised boolean expressions
/// instead of a materialised table
pub fn crc_via_bitwise_expression(m: &Model, bytes: &[u8]) -> Result<u128, ModelError> {
    let width = m.width.ok_or(ModelError::MissingParameter("width"))?;
    let r_in = m.reflect_in.unwrap_or(false);
    let r_out = m.reflect_out.unwrap_or(false);
    let xor_in = m.xor_in.unwrap_or(0);
    let xor_out = m.xor_out.unwrap_or(0);
    let mask = m.mask().unwrap();
    let t_bits = m.table_idx_width.bits();
    let exprs = minimise_table(m)?;

    let mut crc = xor_in & mask;
    let nibbles_per_byte = 8 / t_bits;
    let nibble_mask: u128 = (1u128 << t_bits) - 1;

    let lookup = |index: usize| -> u128 {
        let mut v: u128 = 0;
        for e in &exprs {
            if eval_terms(&e.terms, index as u128, t_bits) {
                v |= 1 << e.bit;
            }
        }
        v
    };

    for &b in bytes {
        let order: Vec<usize> = if r_in {
            (0..nibbles_per_byte).collect()
        } else {
            (0..nibbles_per_byte).rev().collect()
        };
        for k in order {
            let nibble = ((b as u128) >> (k * t_bits)) & nibble_mask;
            if r_in {
                let idx = ((crc ^ nibble) & nibble_mask) as usize;
                crc = (crc >> t_bits) ^ lookup(idx);
            } else {
                let idx = (((crc >> (width - t_bits)) as u128 ^ nibble) & nibble_mask) as usize;
                crc = ((crc << t_bits) & mask) ^ lookup(idx);
            }
            crc &= mask;
        }
    }

    if r_out != r_in {
        crc = reflect(crc, width);
    }
    Ok((crc ^ xor_out) & mask)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kernel::table_driven;

    fn crc32() -> Model {
        Model::new(32, 0x04c11db7, true, 0xffffffff, true, 0xffffffff).unwrap()
    }

    fn crc8() -> Model {
        Model::new(8, 0x07, false, 0, false, 0).unwrap()
    }

    #[test]
    fn table_entries_match() {
        let m = crc8();
        let table = gen_table(&m).unwrap();
        for i in 0..table.len() {
            assert_eq!(table_entry_via_expression(&m, i).unwrap(), table[i]);
        }
    }

    #[test]
    fn matches_table_driven_on_check_value() {
        let m = crc32();
        assert_eq!(
            crc_via_bitwise_expression(&m, b"123456789").unwrap(),
            table_driven(&m, b"123456789").unwrap(),
        );
    }
}
