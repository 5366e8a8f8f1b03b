//! Symbol table feeding the template parser
//!
//! Seeded once from a [`Model`] plus the requested codegen action, then
//! queried by name. Unlike the tool this is modelled on, construction here
//! is pure: no wall-clock timestamp, no filesystem path. Everything a
//! symbol needs comes from the model, the chosen algorithm and C standard,
//! and (for derived values) the kernel/minimiser/bitwise modules.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::bitwise::minimise_table;
use crate::error::ParseError;
use crate::kernel::{gen_table, Algorithm};
use crate::model::Model;

/// Which C dialect the generated source targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CStd {
    C89,
    C99,
}

fn fmt_bool(v: Option<bool>) -> String {
    match v {
        Some(true) => "True".to_string(),
        Some(false) => "False".to_string(),
        None => "Undefined".to_string(),
    }
}

/// `0x%0Wx` with `W = ceil(width_bits/4)`, or the literal `Undefined`
fn fmt_num(v: Option<u128>, width_bits: Option<usize>) -> String {
    match (v, width_bits) {
        (Some(v), Some(w)) => {
            let digits = (w + 3) / 4;
            format!("0x{:0width$x}", v, width = digits)
        }
        (Some(v), None) => format!("0x{:x}", v),
        (None, _) => "Undefined".to_string(),
    }
}

fn c_int_type(width: usize, std: CStd) -> String {
    match std {
        CStd::C89 => {
            if width <= 8 {
                "unsigned char".to_string()
            } else if width <= 16 {
                "unsigned int".to_string()
            } else if width <= 32 {
                "unsigned long".to_string()
            } else {
                "unsigned long long".to_string()
            }
        }
        CStd::C99 => {
            if width <= 8 {
                "uint_fast8_t".to_string()
            } else if width <= 16 {
                "uint_fast16_t".to_string()
            } else if width <= 32 {
                "uint_fast32_t".to_string()
            } else {
                "uint_fast64_t".to_string()
            }
        }
    }
}

/// Seeded static entries + memoised dynamic entries, both addressed by
/// [`SymbolTable::get`]
pub struct SymbolTable {
    model: Model,
    algorithm: Algorithm,
    c_std: CStd,
    prefix: String,
    static_entries: HashMap<String, String>,
    cache: RefCell<HashMap<String, String>>,
}

impl SymbolTable {
    pub fn new(model: Model, algorithm: Algorithm, c_std: CStd) -> Self {
        let mut s = SymbolTable {
            model,
            algorithm,
            c_std,
            prefix: "crc_".to_string(),
            static_entries: HashMap::new(),
            cache: RefCell::new(HashMap::new()),
        };
        s.seed();
        s
    }

    fn seed(&mut self) {
        let m = &self.model;
        let e = &mut self.static_entries;

        e.insert("nop".to_string(), String::new());
        e.insert("program_version".to_string(), "1.0".to_string());
        e.insert("c_std".to_string(), match self.c_std { CStd::C89 => "C89", CStd::C99 => "C99" }.to_string());
        e.insert("c_bool".to_string(), match self.c_std { CStd::C89 => "int", CStd::C99 => "bool" }.to_string());
        e.insert("c_true".to_string(), match self.c_std { CStd::C89 => "1", CStd::C99 => "true" }.to_string());
        e.insert("c_false".to_string(), match self.c_std { CStd::C89 => "0", CStd::C99 => "false" }.to_string());

        e.insert("crc_width".to_string(), m.width.map(|w| w.to_string()).unwrap_or_else(|| "Undefined".to_string()));
        e.insert("crc_poly".to_string(), fmt_num(m.poly, m.width));
        e.insert("crc_xor_in".to_string(), fmt_num(m.xor_in, m.width));
        e.insert("crc_xor_out".to_string(), fmt_num(m.xor_out, m.width));
        e.insert("crc_reflect_in".to_string(), fmt_bool(m.reflect_in));
        e.insert("crc_reflect_out".to_string(), fmt_bool(m.reflect_out));
        e.insert("crc_table_idx_width".to_string(), m.table_idx_width.bits().to_string());
        e.insert("crc_msb_mask".to_string(), m.msb_mask().map(|v| fmt_num(Some(v), m.width)).unwrap_or_else(|| "Undefined".to_string()));
        e.insert("crc_mask".to_string(), m.mask().map(|v| fmt_num(Some(v), m.width)).unwrap_or_else(|| "Undefined".to_string()));
        e.insert("crc_shift".to_string(), m.shift().map(|v| v.to_string()).unwrap_or_else(|| "Undefined".to_string()));

        // The table-driven update loop keeps the register at its native
        // width throughout (matching `kernel::table_driven`, which never
        // pre-shifts the register the way a byte-wide-table optimisation
        // would), so these have the same value as their unshifted
        // counterparts above; they exist as their own symbols so the
        // update-loop text can name the mask it applies independent of
        // whether a future algorithm wants a genuinely shifted one.
        e.insert("crc_mask_shifted".to_string(), m.mask().map(|v| fmt_num(Some(v), m.width)).unwrap_or_else(|| "Undefined".to_string()));
        e.insert("msb_mask_shifted".to_string(), m.msb_mask().map(|v| fmt_num(Some(v), m.width)).unwrap_or_else(|| "Undefined".to_string()));
        e.insert("cfg_poly_shifted".to_string(), fmt_num(m.poly, m.width));

        e.insert("crc_width_undefined".to_string(), fmt_bool(Some(m.width.is_none())));
        e.insert("crc_poly_undefined".to_string(), fmt_bool(Some(m.poly.is_none())));
        e.insert("crc_xor_in_undefined".to_string(), fmt_bool(Some(m.xor_in.is_none())));
        e.insert("crc_xor_out_undefined".to_string(), fmt_bool(Some(m.xor_out.is_none())));
        e.insert("crc_reflect_in_undefined".to_string(), fmt_bool(Some(m.reflect_in.is_none())));
        e.insert("crc_reflect_out_undefined".to_string(), fmt_bool(Some(m.reflect_out.is_none())));
        e.insert("crc_fully_defined".to_string(), fmt_bool(Some(m.is_fully_defined())));

        e.insert("crc_t".to_string(), m.width.map(|w| c_int_type(w, self.c_std)).unwrap_or_else(|| "Undefined".to_string()));
        e.insert("crc_prefix".to_string(), self.prefix.clone());
        e.insert("crc_update_function".to_string(), format!("{}update", self.prefix));
        e.insert("crc_table_name".to_string(), format!("{}table", self.prefix));
        e.insert("crc_algorithm".to_string(), self.algorithm.name().to_string());
        e.insert("output_file".to_string(), "crc".to_string());
        e.insert("header_protection".to_string(), "__CRC_H__".to_string());

        e.insert(
            "cfg_width".to_string(),
            "$if ($crc_width_undefined == True){:unsigned int width;\n:}".to_string(),
        );
        e.insert(
            "cfg_poly".to_string(),
            "$if ($crc_poly_undefined == True){:crc_t poly;\n:}".to_string(),
        );
    }

    /// Looks up `name`, computing and memoising it on first access
    pub fn get(&self, name: &str) -> Result<String, ParseError> {
        if let Some(v) = self.cache.borrow().get(name) {
            return Ok(v.clone());
        }
        if let Some(v) = self.static_entries.get(name) {
            self.cache.borrow_mut().insert(name.to_string(), v.clone());
            return Ok(v.clone());
        }
        let v = self.compute(name)?;
        self.cache.borrow_mut().insert(name.to_string(), v.clone());
        Ok(v)
    }

    fn compute(&self, name: &str) -> Result<String, ParseError> {
        let m = &self.model;
        match name {
            "constant_crc_init" | "crc_init_value" => Ok(fmt_num(m.xor_in, m.width)),

            "constant_crc_table" | "crc_table_init" => {
                let table = gen_table(m).map_err(|e| ParseError::UnknownTerminal(e.to_string()))?;
                let digits = m.width.map(|w| (w + 3) / 4).unwrap_or(2);
                Ok(table
                    .iter()
                    .map(|v| format!("0x{:0width$x}", v, width = digits))
                    .collect::<Vec<_>>()
                    .join(", "))
            }

            "use_reflect_func" => Ok(fmt_bool(Some(
                m.reflect_in.unwrap_or(false) || m.reflect_out.unwrap_or(false),
            ))),

            "static_reflect_func" => {
                Ok(concat!(
                    "static crc_t crc_reflect(crc_t data, size_t data_len)\n",
                    "{\n",
                    "    crc_t ret = data & 0x01;\n",
                    "    for (size_t i = 1; i < data_len; i++) {\n",
                    "        data >>= 1;\n",
                    "        ret = (ret << 1) | (data & 0x01);\n",
                    "    }\n",
                    "    return ret;\n",
                    "}\n",
                )
                .to_string())
            }

            "simple_crc_update_def" => {
                Ok(table_core(m, |idx| format!("$crc_table_name[{}]", idx)))
            }

            "crc_bitwise_expression_update_def" => {
                Ok(table_core(m, |idx| format!("crc_bitwise_expression_function({})", idx)))
            }

            "crc_bitwise_expression_function_def" => Ok(concat!(
                "static $crc_t crc_bitwise_expression_function(unsigned int tbl_idx)\n",
                "{\n",
                "    $crc_t bits = tbl_idx;\n",
                "    return $crc_bitwise_expression;\n",
                "}\n",
            )
            .to_string()),

            "bit_by_bit_update_def" => Ok(
                "        for (unsigned int b = 0; b < 8; b++) {\n            $c_bool bit = (crc & $crc_msb_mask) != 0;\n            crc = (crc << 1) & $crc_mask;\n            if ((d[i] >> (7 - b)) & 0x01) {\n                crc ^= 0x01;\n            }\n            if (bit) {\n                crc ^= $crc_poly;\n            }\n        }"
                    .to_string(),
            ),

            "bit_by_bit_fast_update_def" => Ok(
                "        for (unsigned int b = 0x80; b; b >>= 1) {\n            $c_bool bit = (crc & $crc_msb_mask) != 0;\n            crc <<= 1;\n            if (d[i] & b) {\n                crc |= 0x01;\n            }\n            if (bit) {\n                crc ^= $crc_poly;\n            }\n        }\n        crc &= $crc_mask;"
                    .to_string(),
            ),

            "inline_crc_finalize" | "crc_final_value" => {
                if m.reflect_out.is_some() && m.xor_out.is_some() {
                    Ok(format!(
                        "crc{} ^ {}",
                        if m.reflect_out == Some(true) { " = crc_reflect(crc, $crc_width)" } else { "" },
                        fmt_num(m.xor_out, m.width)
                    ))
                } else {
                    Ok("Undefined".to_string())
                }
            }

            "simple_crc_finalize_def" => Ok(
                "$if ($crc_reflect_out == True){:    crc = crc_reflect(crc, $crc_width);\n:}    crc = (crc ^ $crc_xor_out) & $crc_mask;"
                    .to_string(),
            ),

            "crc_bitwise_expression" => {
                let exprs = minimise_table(m).map_err(|e| ParseError::UnknownTerminal(e.to_string()))?;
                let mut parts = Vec::new();
                for be in &exprs {
                    if be.terms.is_empty() {
                        continue;
                    }
                    let term_strs: Vec<String> = be
                        .terms
                        .iter()
                        .map(|t| term_to_c(t))
                        .collect();
                    parts.push(format!("(({}) << {})", term_strs.join(" | "), be.bit));
                }
                Ok(parts.join(" | "))
            }

            "h_template" => Ok(include_str!("../templates/h.tmpl").to_string()),
            "c_template" => Ok(include_str!("../templates/c.tmpl").to_string()),
            "main_template" => Ok(include_str!("../templates/main.tmpl").to_string()),
            "getopt_template" => Ok(include_str!("../templates/getopt.tmpl").to_string()),

            _ => Err(ParseError::UnknownTerminal(name.to_string())),
        }
    }
}

/// Renders the table-driven update loop, unrolled at generation time over
/// every nibble a byte splits into under `m.table_idx_width`, matching
/// `kernel::table_driven`'s reflected/non-reflected index and shift
/// direction exactly. `lookup` turns a computed index expression into the
/// C expression that fetches a value for it (a table dereference for
/// table-driven, a call into the bitwise-expression function otherwise),
/// so both codegen paths share this one loop shape.
fn table_core(m: &Model, lookup: impl Fn(&str) -> String) -> String {
    let t_bits = m.table_idx_width.bits();
    let r_in = m.reflect_in.unwrap_or(false);
    let nibbles = 8 / t_bits;
    let nibble_mask: u128 = (1u128 << t_bits) - 1;
    let nibble_mask_hex = format!("0x{:x}", nibble_mask);

    let nibble_expr = |k: usize| -> String {
        if t_bits == 8 {
            "d[i]".to_string()
        } else {
            format!("((d[i] >> {}) & {})", k * t_bits, nibble_mask_hex)
        }
    };

    let mut lines = Vec::new();
    if r_in {
        // LSB-first: crc shifts right, the index reads the crc as-is
        for k in 0..nibbles {
            lines.push(format!("        tbl_idx = (crc ^ {}) & {};", nibble_expr(k), nibble_mask_hex));
            lines.push(format!("        crc = ({}) ^ (crc >> {});", lookup("tbl_idx"), t_bits));
            lines.push("        crc &= $crc_mask_shifted;".to_string());
        }
    } else {
        // MSB-first: crc shifts left, the index reads crc's current top bits
        let shr = m.width.map(|w| w.saturating_sub(t_bits).to_string())
            .unwrap_or_else(|| "($crc_width - $crc_table_idx_width)".to_string());
        for k in (0..nibbles).rev() {
            lines.push(format!(
                "        tbl_idx = ((crc >> {}) ^ {}) & {};",
                shr, nibble_expr(k), nibble_mask_hex,
            ));
            lines.push(format!("        crc = ({}) ^ (crc << {});", lookup("tbl_idx"), t_bits));
            lines.push("        crc &= $crc_mask_shifted;".to_string());
        }
    }
    lines.join("\n")
}

/// Renders one `{0,1,-,^,~}` minterm as a C sub-expression over an 8-bit
/// `bits` variable, MSB of the term at bit `t_bits-1`
///
/// `^`-marked bits need an odd XOR parity to match, `~`-marked bits need an
/// even one (see `bitwise::term_matches`), so the two groups are combined
/// separately and the XNOR group is negated before joining.
fn term_to_c(term: &str) -> String {
    let t_bits = term.len();
    let mut ands = Vec::new();
    let mut xor_bits = Vec::new();
    let mut xnor_bits = Vec::new();
    for (i, c) in term.chars().enumerate() {
        let shift = t_bits - 1 - i;
        let bit_expr = if shift == 0 {
            "(bits & 0x01)".to_string()
        } else {
            format!("((bits >> {}) & 0x01)", shift)
        };
        match c {
            '0' => ands.push(format!("!{}", bit_expr)),
            '1' => ands.push(bit_expr),
            '-' => {}
            '^' => xor_bits.push(bit_expr),
            '~' => xnor_bits.push(bit_expr),
            _ => unreachable!("invalid term character"),
        }
    }
    let mut clauses = ands;
    if !xor_bits.is_empty() {
        clauses.push(format!("({})", xor_bits.join(" ^ ")));
    }
    if !xnor_bits.is_empty() {
        clauses.push(format!("!({})", xnor_bits.join(" ^ ")));
    }
    if clauses.is_empty() {
        "1".to_string()
    } else {
        clauses.join(" && ")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn crc32() -> Model {
        Model::new(32, 0x04c11db7, true, 0xffffffff, true, 0xffffffff).unwrap()
    }

    #[test]
    fn memoises() {
        let s = SymbolTable::new(crc32(), Algorithm::TableDriven, CStd::C99);
        let a = s.get("crc_table_init").unwrap();
        let b = s.get("crc_table_init").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_name_errors() {
        let s = SymbolTable::new(crc32(), Algorithm::TableDriven, CStd::C99);
        assert!(matches!(s.get("not_a_symbol"), Err(ParseError::UnknownTerminal(_))));
    }

    #[test]
    fn crc_t_by_width_and_std() {
        let s = SymbolTable::new(crc32(), Algorithm::TableDriven, CStd::C99);
        assert_eq!(s.get("crc_t").unwrap(), "uint_fast32_t");
        let s89 = SymbolTable::new(crc32(), Algorithm::TableDriven, CStd::C89);
        assert_eq!(s89.get("crc_t").unwrap(), "unsigned long");
    }

    #[test]
    fn crc16_table_starts_as_expected() {
        // CRC-16/ARC: reflected, poly 0x8005
        let m = Model::new(16, 0x8005, true, 0, true, 0).unwrap();
        let s = SymbolTable::new(m, Algorithm::TableDriven, CStd::C99);
        let t = s.get("crc_table_init").unwrap();
        assert!(t.starts_with("0x0000, 0xc0c1, 0xc181, 0x0140"));
    }

    #[test]
    fn term_to_c_negates_xnor_group_only() {
        // an all-xor term and an all-xnor term over the same two bits must
        // render as logical negations of each other, matching
        // `bitwise::term_matches`'s odd-vs-even parity requirement
        let xor_only = term_to_c("^^");
        let xnor_only = term_to_c("~~");
        assert_eq!(xor_only, "(((bits >> 1) & 0x01) ^ (bits & 0x01))");
        assert_eq!(xnor_only, "!(((bits >> 1) & 0x01) ^ (bits & 0x01))");
    }

    #[test]
    fn term_to_c_mixes_and_xor_and_xnor_clauses() {
        // plain-bit test, xor group, and negated xnor group all AND together
        let mixed = term_to_c("1^~");
        assert_eq!(
            mixed,
            "((bits >> 2) & 0x01) && (((bits >> 1) & 0x01)) && !((bits & 0x01))"
        );
    }

    #[test]
    fn simple_crc_update_def_branches_on_reflect_direction() {
        let reflected = SymbolTable::new(crc32(), Algorithm::TableDriven, CStd::C99);
        let out = reflected.get("simple_crc_update_def").unwrap();
        assert!(out.contains("tbl_idx = (crc ^ d[i]) & 0xff;"));
        assert!(out.contains("(crc >> 8)"));
        assert!(!out.contains("<< 8"));

        // CCITT: non-reflected both directions
        let m = Model::new(16, 0x1021, false, 0xffff, false, 0).unwrap();
        let nonreflected = SymbolTable::new(m, Algorithm::TableDriven, CStd::C99);
        let out = nonreflected.get("simple_crc_update_def").unwrap();
        assert!(out.contains("tbl_idx = ((crc >> 8) ^ d[i]) & 0xff;"));
        assert!(out.contains("(crc << 8)"));
    }

    #[test]
    fn simple_crc_update_def_unrolls_sub_byte_table_index() {
        use crate::model::ModelBuilder;
        let mut b = ModelBuilder::new();
        b.width(8).unwrap();
        b.poly(0x07);
        b.reflect_in(false);
        b.xor_in(0);
        b.reflect_out(false);
        b.xor_out(0);
        b.table_idx_width(4).unwrap();
        let m = b.build().unwrap();
        let s = SymbolTable::new(m, Algorithm::TableDriven, CStd::C99);
        let out = s.get("simple_crc_update_def").unwrap();
        // non-reflected, T=4: high nibble consumed first
        assert_eq!(out.matches("tbl_idx =").count(), 2);
        assert!(out.contains("(d[i] >> 4) & 0xf"));
        assert!(out.contains("(d[i] >> 0) & 0xf"));
        assert!(out.find("(d[i] >> 4)").unwrap() < out.find("(d[i] >> 0)").unwrap());
    }
}
