//! Reference CRC algorithms
//!
//! Four independent implementations of the same checksum, kept
//! independent on purpose: [`cross_check`] runs whichever subset the
//! caller asks for and fails loudly if they disagree.

use crate::error::{CrcError, InconsistentAlgorithms, ModelError};
use crate::model::Model;

/// Selects one (or more, for cross-checking) reference algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    BitByBit,
    BitByBitFast,
    TableDriven,
    BitwiseExpression,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::BitByBit => "bit-by-bit",
            Algorithm::BitByBitFast => "bit-by-bit-fast",
            Algorithm::TableDriven => "table-driven",
            Algorithm::BitwiseExpression => "bitwise-expression",
        }
    }
}

/// Reverses the low `n` bits of `v`, leaving the rest untouched
pub fn reflect(v: u128, n: usize) -> u128 {
    let mut v = v;
    let mut t = 0u128;
    for _ in 0..n {
        t = (t << 1) | (v & 1);
        v >>= 1;
    }
    t
}

fn require_width(m: &Model) -> Result<usize, ModelError> {
    m.width.ok_or(ModelError::MissingParameter("width"))
}

fn require_poly(m: &Model) -> Result<u128, ModelError> {
    m.poly.ok_or(ModelError::MissingParameter("poly"))
}

/// bit-by-bit (non-direct init): walks the augmented message bit by bit
pub fn bit_by_bit(m: &Model, bytes: &[u8]) -> Result<u128, ModelError> {
    let width = require_width(m)?;
    let poly = require_poly(m)?;
    let r_in = m.reflect_in.unwrap_or(false);
    let r_out = m.reflect_out.unwrap_or(false);
    let xor_in = m.xor_in.unwrap_or(0);
    let xor_out = m.xor_out.unwrap_or(0);
    let mask = m.mask().unwrap();
    let msb_mask = m.msb_mask().unwrap();

    let mut crc = xor_in & mask;

    let total_bits = bytes.len() * 8 + width;
    for bit_idx in 0..total_bits {
        let bit = if bit_idx < bytes.len() * 8 {
            let byte = bytes[bit_idx / 8];
            let bit_in_byte = if r_in { bit_idx % 8 } else { 7 - (bit_idx % 8) };
            ((byte >> bit_in_byte) & 1) as u128
        } else {
            0
        };

        let msb_set = (crc & msb_mask) != 0;
        crc = ((crc << 1) | bit) & mask;
        if msb_set {
            crc ^= poly;
        }
        crc &= mask;
    }

    if r_out {
        crc = reflect(crc, width);
    }
    Ok((crc ^ xor_out) & mask)
}

/// bit-by-bit-fast (direct init): consumes whole bytes
pub fn bit_by_bit_fast(m: &Model, bytes: &[u8]) -> Result<u128, ModelError> {
    let width = require_width(m)?;
    let poly = require_poly(m)?;
    let r_in = m.reflect_in.unwrap_or(false);
    let r_out = m.reflect_out.unwrap_or(false);
    let xor_in = m.xor_in.unwrap_or(0);
    let xor_out = m.xor_out.unwrap_or(0);
    let mask = m.mask().unwrap();
    let msb_mask = m.msb_mask().unwrap();

    let mut crc = xor_in & mask;

    for &b in bytes {
        let b = if r_in { reflect(b as u128, 8) as u8 } else { b };
        for i in (0..8).rev() {
            let input_bit = (b >> i) & 1 != 0;
            let msb_set = (crc & msb_mask) != 0;
            let bit = msb_set ^ input_bit;
            crc = (crc << 1) & mask;
            if bit {
                crc ^= poly;
            }
            crc &= mask;
        }
    }

    if r_out {
        crc = reflect(crc, width);
    }
    Ok((crc ^ xor_out) & mask)
}

/// Populates the `2^T`-entry table used by [`table_driven`]
pub fn gen_table(m: &Model) -> Result<Vec<u128>, ModelError> {
    let width = require_width(m)?;
    let poly = require_poly(m)?;
    let r_in = m.reflect_in.unwrap_or(false);
    let mask = m.mask().unwrap();
    let t_bits = m.table_idx_width.bits();
    let table_width = m.table_width();

    let mut table = Vec::with_capacity(table_width);
    for i in 0..table_width {
        let mut c = i as u128;
        if r_in {
            c = reflect(c, t_bits);
        }
        c = (c << (width.saturating_sub(t_bits))) & mask;

        let msb_mask = m.msb_mask().unwrap();
        for _ in 0..t_bits {
            let msb_set = (c & msb_mask) != 0;
            c = (c << 1) & mask;
            if msb_set {
                c ^= poly;
            }
            c &= mask;
        }

        if r_in {
            c = reflect(c, width);
        }
        table.push(c);
    }
    Ok(table)
}

/// table-driven: consumes `table_idx_width`-bit nibbles per lookup
pub fn table_driven(m: &Model, bytes: &[u8]) -> Result<u128, ModelError> {
    let width = require_width(m)?;
    let r_in = m.reflect_in.unwrap_or(false);
    let r_out = m.reflect_out.unwrap_or(false);
    let xor_in = m.xor_in.unwrap_or(0);
    let xor_out = m.xor_out.unwrap_or(0);
    let mask = m.mask().unwrap();
    let t_bits = m.table_idx_width.bits();
    let table = gen_table(m)?;

    let mut crc = xor_in & mask;
    let nibbles_per_byte = 8 / t_bits;
    let nibble_mask: u128 = (1u128 << t_bits) - 1;

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
                crc = (crc >> t_bits) ^ table[idx];
            } else {
                let idx = (((crc >> (width - t_bits)) as u128 ^ nibble) & nibble_mask) as usize;
                crc = ((crc << t_bits) & mask) ^ table[idx];
            }
            crc &= mask;
        }
    }

    if r_out != r_in {
        crc = reflect(crc, width);
    }
    Ok((crc ^ xor_out) & mask)
}

/// Runs every algorithm in `algorithms` and fails if any two disagree
pub fn cross_check(
    m: &Model,
    algorithms: &[Algorithm],
    bytes: &[u8],
) -> Result<u128, CrcError> {
    let mut results = Vec::with_capacity(algorithms.len());
    for &alg in algorithms {
        let v = match alg {
            Algorithm::BitByBit => bit_by_bit(m, bytes)?,
            Algorithm::BitByBitFast => bit_by_bit_fast(m, bytes)?,
            Algorithm::TableDriven => table_driven(m, bytes)?,
            Algorithm::BitwiseExpression => {
                crate::bitwise::crc_via_bitwise_expression(m, bytes)?
            }
        };
        tracing::trace!(algorithm = alg.name(), result = %format!("{:#x}", v), "ran algorithm");
        results.push((alg.name(), v));
    }

    let first = results[0].1;
    if results.iter().any(|&(_, v)| v != first) {
        return Err(CrcError::InconsistentAlgorithms(InconsistentAlgorithms {
            results,
        }));
    }
    Ok(first)
}

/// Computes the CRC of `bytes` under model `m` using `algorithm`
///
/// Pass more than one algorithm bit by calling [`cross_check`] directly;
/// this is the single-algorithm convenience entry point described in the
/// external interface.
pub fn crc(m: &Model, algorithm: Algorithm, bytes: &[u8]) -> Result<u128, CrcError> {
    cross_check(m, &[algorithm], bytes)
}
