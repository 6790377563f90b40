//! Two-pass assembler for the Hack machine.
//!
//! Translates symbolic Hack assembly (`.asm`) into 16-bit binary
//! machine code (`.hack`, one ASCII `0`/`1` word per line).
//!
//! # Architecture
//!
//! - [`parser`]: zero-copy classification of source lines
//! - [`code`]: mnemonic-to-bits tables (compile-time perfect hashing)
//! - [`symbol_table`]: predefined symbols, labels, and variable allocation
//! - [`first_pass`] / [`second_pass`]: the driver halves
//!
//! Pass 1 walks the instruction stream binding each `(Label)` to the
//! address of the instruction that follows it. Pass 2 walks it again,
//! resolving symbols (allocating RAM slots from 16 upward for fresh
//! variables) and emitting one binary word per real instruction.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

use std::fmt;
use std::io::{self, Write};

pub mod code;
pub mod parser;
pub mod symbol_table;

pub use code::CodeError;
pub use parser::{AsmLexer, AsmLine};
pub use symbol_table::SymbolTable;

/// A-instruction literals are 15-bit.
const MAX_ADDRESS: u16 = 32767;

/// Anything that can stop the emit pass.
#[derive(Debug)]
pub enum AssembleError {
    /// Unknown dest/comp/jump mnemonic.
    Code(CodeError),
    /// Numeric A-instruction literal outside `0..=32767`.
    AddressOutOfRange(String),
    Io(io::Error),
}

impl std::error::Error for AssembleError {}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(e) => e.fmt(f),
            Self::AddressOutOfRange(literal) => {
                write!(f, "A-instruction literal out of range: @{literal}")
            }
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl From<CodeError> for AssembleError {
    fn from(e: CodeError) -> Self {
        Self::Code(e)
    }
}

impl From<io::Error> for AssembleError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Pass 1: bind every label to the address of the next instruction.
///
/// Labels emit no code, so only A- and C-instructions advance the
/// instruction counter.
pub fn first_pass(lines: &[String], symbols: &mut SymbolTable) {
    let mut rom_address = 0u16;
    for instruction in AsmLexer::new(lines) {
        match instruction {
            AsmLine::Label(name) => symbols.bind_label(name, rom_address),
            AsmLine::AInstruction(_) | AsmLine::CInstruction { .. } => rom_address += 1,
        }
    }
}

/// Pass 2: emit one 16-bit word per instruction.
///
/// Symbolic A-instructions resolve through the table; a symbol not
/// bound by pass 1 is a fresh variable and gets the next RAM slot.
pub fn second_pass<W: Write>(
    lines: &[String],
    symbols: &mut SymbolTable,
    out: &mut W,
) -> Result<(), AssembleError> {
    for instruction in AsmLexer::new(lines) {
        match instruction {
            AsmLine::AInstruction(symbol) => {
                let address = if !symbol.is_empty() && symbol.bytes().all(|b| b.is_ascii_digit()) {
                    match symbol.parse::<u16>() {
                        Ok(n) if n <= MAX_ADDRESS => n,
                        _ => return Err(AssembleError::AddressOutOfRange(symbol.to_string())),
                    }
                } else {
                    symbols.resolve(symbol)
                };
                writeln!(out, "{}", code::encode_a_instruction(address))?;
            }
            AsmLine::CInstruction { dest, comp, jump } => {
                writeln!(out, "{}", code::encode_c_instruction(dest, comp, jump)?)?;
            }
            AsmLine::Label(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(source: &[&str]) -> Result<Vec<String>, AssembleError> {
        let lines: Vec<String> = source.iter().map(|s| (*s).to_string()).collect();
        let mut symbols = SymbolTable::new();
        first_pass(&lines, &mut symbols);
        let mut out = Vec::new();
        second_pass(&lines, &mut symbols, &mut out)?;
        Ok(String::from_utf8(out)
            .unwrap()
            .lines()
            .map(ToString::to_string)
            .collect())
    }

    #[test]
    fn straight_line_program() {
        let words = assemble(&["@2", "D=A", "@3", "D=D+A", "@0", "M=D"]).unwrap();
        assert_eq!(
            words,
            [
                "0000000000000010",
                "1110110000010000",
                "0000000000000011",
                "1110000010010000",
                "0000000000000000",
                "1110001100001000",
            ]
        );
    }

    #[test]
    fn labels_resolve_forward_and_backward() {
        let words = assemble(&["(TOP)", "@TOP", "0;JMP", "@BOTTOM", "(BOTTOM)"]).unwrap();
        assert_eq!(words[0], code::encode_a_instruction(0));
        assert_eq!(words[2], code::encode_a_instruction(3));
    }

    #[test]
    fn variables_allocate_in_first_mention_order() {
        let words = assemble(&["@sum", "M=0", "@i", "M=1", "@sum", "D=M"]).unwrap();
        assert_eq!(words[0], "0000000000010000"); // sum = 16
        assert_eq!(words[2], "0000000000010001"); // i = 17
        assert_eq!(words[4], "0000000000010000"); // sum again
    }

    #[test]
    fn instruction_count_matches_output_lines() {
        let source = ["@1", "(A)", "D=A", "(B)", "@B", "0;JMP"];
        let words = assemble(&source).unwrap();
        // 4 real instructions, 2 labels
        assert_eq!(words.len(), 4);
    }

    #[test]
    fn literal_out_of_range_is_rejected() {
        assert!(matches!(
            assemble(&["@32768"]),
            Err(AssembleError::AddressOutOfRange(_))
        ));
        assert!(assemble(&["@32767"]).is_ok());
    }

    #[test]
    fn unknown_mnemonic_is_rejected() {
        assert!(matches!(
            assemble(&["D=D*2"]),
            Err(AssembleError::Code(CodeError::UnknownComp(_)))
        ));
    }
}
