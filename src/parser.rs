//! Recursive-descent evaluator for the macro/template language
//!
//! ```text
//! D        := (Gibberish | Identifier | '{:' D ':}' | IfBlock)*
//! IfBlock  := '$if' '(' E ')' '{:' D ':}' ('$elif' '(' E ')' '{:' D ':}')* ('$else' '{:' D ':}')?
//! E        := And ('or' And)*
//! And      := Cmp ('and' Cmp)*
//! Cmp      := Term CompareOp Term
//! Term     := Number | String | Identifier | '(' E ')'
//! ```
//!
//! Identifier expansion never happens in place: instead of substituting and
//! moving on, the looked-up value is pushed back onto the lexer's input and
//! rescanned, so a symbol whose value itself contains `$name` tokens is
//! fully expanded by the same loop.

use std::cmp::Ordering;

use crate::error::ParseError;
use crate::lexer::{Lexer, State, Token};
use crate::symtable::SymbolTable;

/// Expands `template` against `symtable`, returning the generated text
pub fn expand(symtable: &SymbolTable, template: &str) -> Result<String, ParseError> {
    let mut p = Parser { lexer: Lexer::new(template), symtable };
    let mut out = String::new();
    p.parse_data(true, &mut out)?;
    match p.lexer.peek() {
        Token::Eof => Ok(out),
        Token::BlockClose => Err(ParseError::MisalignedBlock(":}".to_string())),
        other => Err(ParseError::WrongToken(format!("{:?}", other))),
    }
}

struct Parser<'a> {
    lexer: Lexer,
    symtable: &'a SymbolTable,
}

fn describe(tok: &Token) -> String {
    match tok {
        Token::Identifier(s) => format!("${}", s),
        Token::Gibberish(s) | Token::Number(s) | Token::String(s) | Token::Unknown(s) => s.clone(),
        Token::CompareOp(s) => s.clone(),
        other => format!("{:?}", other),
    }
}

impl<'a> Parser<'a> {
    fn parse_data(&mut self, do_print: bool, out: &mut String) -> Result<(), ParseError> {
        self.lexer.set_state(State::Gibberish);
        loop {
            match self.lexer.peek() {
                Token::Eof | Token::BlockClose => return Ok(()),
                Token::Gibberish(s) => {
                    self.lexer.advance(false);
                    if do_print {
                        out.push_str(&s);
                    }
                }
                Token::BlockOpen => {
                    self.lexer.advance(true);
                    self.parse_data(do_print, out)?;
                    self.expect_block_close()?;
                }
                Token::Identifier(name) => match name.as_str() {
                    "if" => {
                        self.lexer.advance(false);
                        self.parse_if_block(do_print, out)?;
                    }
                    "elif" | "else" => return Ok(()),
                    _ => {
                        self.lexer.advance(false);
                        if do_print {
                            let value = self.symtable.get(&name)?;
                            self.lexer.prepend(&value);
                        }
                    }
                },
                other => return Err(ParseError::WrongToken(describe(&other))),
            }
        }
    }

    fn expect_block_open(&mut self) -> Result<(), ParseError> {
        self.lexer.set_state(State::Gibberish);
        self.lexer.delete_spaces(false);
        match self.lexer.advance(true) {
            Token::BlockOpen => Ok(()),
            other => Err(ParseError::ExpectedOpenBlock(describe(&other))),
        }
    }

    fn expect_block_close(&mut self) -> Result<(), ParseError> {
        match self.lexer.advance(true) {
            Token::BlockClose => Ok(()),
            other => Err(ParseError::ExpectedCloseBlock(describe(&other))),
        }
    }

    fn parse_if_block(&mut self, do_print: bool, out: &mut String) -> Result<(), ParseError> {
        let cond = self.parse_condition()?;
        self.expect_block_open()?;
        let mut taken = cond;
        self.parse_data(do_print && cond, out)?;
        self.expect_block_close()?;

        loop {
            self.lexer.set_state(State::Gibberish);
            self.lexer.delete_spaces(false);
            match self.lexer.peek() {
                Token::Identifier(name) if name == "elif" => {
                    self.lexer.advance(false);
                    let cond = self.parse_condition()?;
                    self.expect_block_open()?;
                    self.parse_data(do_print && !taken && cond, out)?;
                    self.expect_block_close()?;
                    taken = taken || cond;
                }
                Token::Identifier(name) if name == "else" => {
                    self.lexer.advance(false);
                    self.expect_block_open()?;
                    self.parse_data(do_print && !taken, out)?;
                    self.expect_block_close()?;
                    taken = true;
                    break;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn parse_condition(&mut self) -> Result<bool, ParseError> {
        self.lexer.set_state(State::Expression);
        match self.lexer.advance(false) {
            Token::ParenOpen => {}
            other => return Err(ParseError::ExpectedOpenParen(describe(&other))),
        }
        let v = self.parse_or()?;
        match self.lexer.advance(false) {
            Token::ParenClose => {}
            other => return Err(ParseError::ExpectedCloseParen(describe(&other))),
        }
        Ok(v)
    }

    fn parse_or(&mut self) -> Result<bool, ParseError> {
        let mut v = self.parse_and()?;
        loop {
            match self.lexer.peek() {
                Token::Or => {
                    self.lexer.advance(false);
                    let rhs = self.parse_and()?;
                    v = v || rhs;
                }
                _ => return Ok(v),
            }
        }
    }

    fn parse_and(&mut self) -> Result<bool, ParseError> {
        let mut v = self.parse_cmp()?;
        loop {
            match self.lexer.peek() {
                Token::And => {
                    self.lexer.advance(false);
                    let rhs = self.parse_cmp()?;
                    v = v && rhs;
                }
                _ => return Ok(v),
            }
        }
    }

    fn parse_cmp(&mut self) -> Result<bool, ParseError> {
        let lhs = self.parse_term()?;
        let op = match self.lexer.advance(false) {
            Token::CompareOp(op) => op,
            other => return Err(ParseError::ExpectedOperator(describe(&other))),
        };
        let rhs = self.parse_term()?;
        Ok(compare(&lhs, &rhs, &op))
    }

    fn parse_term(&mut self) -> Result<String, ParseError> {
        match self.lexer.advance(false) {
            Token::Number(s) | Token::String(s) => Ok(s),
            Token::Identifier(name) => self.symtable.get(&name),
            Token::ParenOpen => {
                let v = self.parse_or()?;
                match self.lexer.advance(false) {
                    Token::ParenClose => {}
                    other => return Err(ParseError::ExpectedCloseParen(describe(&other))),
                }
                Ok(if v { "True".to_string() } else { "False".to_string() })
            }
            other => Err(ParseError::WrongToken(describe(&other))),
        }
    }
}

fn parse_int(s: &str) -> Option<i128> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        i128::from_str_radix(hex, 16).ok()
    } else {
        s.parse::<i128>().ok()
    }
}

/// Numeric comparison if both sides parse as integers, string comparison
/// otherwise. `Undefined` is a string literal and never parses as a number,
/// so it always compares unequal to any numeric operand.
fn compare(lhs: &str, rhs: &str, op: &str) -> bool {
    let ord = match (parse_int(lhs), parse_int(rhs)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => lhs.cmp(rhs),
    };
    match op {
        "==" => ord == Ordering::Equal,
        "!=" => ord != Ordering::Equal,
        "<" => ord == Ordering::Less,
        "<=" => ord != Ordering::Greater,
        ">" => ord == Ordering::Greater,
        ">=" => ord != Ordering::Less,
        _ => unreachable!("lexer only emits the six recognised operators"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::Model;
    use crate::symtable::{CStd, SymbolTable};
    use crate::kernel::Algorithm;

    fn table() -> SymbolTable {
        let m = Model::new(32, 0x04c11db7, true, 0xffffffff, true, 0xffffffff).unwrap();
        SymbolTable::new(m, Algorithm::TableDriven, CStd::C99)
    }

    #[test]
    fn plain_gibberish_passes_through() {
        let s = table();
        assert_eq!(expand(&s, "hello world").unwrap(), "hello world");
    }

    #[test]
    fn identifier_expands() {
        let s = table();
        assert_eq!(expand(&s, "width=$crc_width").unwrap(), "width=32");
    }

    #[test]
    fn if_else_picks_one_arm() {
        let s = table();
        let out = expand(&s, "$if ($crc_width == 32){:yes:}$else{:no:}").unwrap();
        assert_eq!(out, "yes");
        let out = expand(&s, "$if ($crc_width == 16){:yes:}$else{:no:}").unwrap();
        assert_eq!(out, "no");
    }

    #[test]
    fn elif_chain() {
        let s = table();
        let out = expand(
            &s,
            "$if ($crc_width == 8){:a:}$elif ($crc_width == 32){:b:}$else{:c:}",
        )
        .unwrap();
        assert_eq!(out, "b");
    }

    #[test]
    fn literal_dollar_survives() {
        let s = table();
        assert_eq!(expand(&s, "cost: $$5").unwrap(), "cost: $5");
    }

    #[test]
    fn unknown_identifier_errors() {
        let s = table();
        assert!(matches!(expand(&s, "$not_a_real_symbol"), Err(ParseError::UnknownTerminal(_))));
    }

    #[test]
    fn parenthesized_subexpression_is_a_term_not_a_bare_cmp() {
        let s = table();
        // '(' E ')' is a Term: it still needs a CompareOp to form a Cmp
        let out = expand(&s, "$if (($crc_width == 32) == True){:y:}$else{:n:}").unwrap();
        assert_eq!(out, "y");
        // no trailing operator after the parenthesized group is a parse error
        assert!(expand(&s, "$if (($crc_width == 32)){:y:}$else{:n:}").is_err());
    }

    #[test]
    fn undefined_compares_unequal_to_number() {
        let m = Model::new(32, 0x04c11db7, true, 0xffffffff, true, 0xffffffff).unwrap();
        let s = SymbolTable::new(m, Algorithm::TableDriven, CStd::C99);
        let out = expand(&s, "$if ($crc_table_idx_width_forced != 0){:y:}$else{:n:}");
        // unresolved symbol -> error, since this name intentionally does not exist
        assert!(out.is_err());
    }
}
