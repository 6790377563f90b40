//! Binary encoding of Hack instructions.
//!
//! The three C-instruction fields are translated through compile-time
//! perfect-hash tables (PHF), so a lookup is a single probe with no
//! runtime table construction. A mnemonic that is not in its table is a
//! hard error: the assembler aborts rather than emit a best-guess bit
//! pattern.

use std::fmt;

use phf::phf_map;

/// Destination mnemonic to its 3-bit field.
///
/// The empty string is the null destination (no register written).
static DEST_MAP: phf::Map<&'static str, &'static str> = phf_map! {
    "" => "000",
    "M" => "001",
    "D" => "010",
    "MD" => "011",
    "A" => "100",
    "AM" => "101",
    "AD" => "110",
    "AMD" => "111",
};

/// Computation mnemonic to its 7-bit field (`a` bit + `cccccc`).
///
/// The leading bit selects the second operand register: 0 reads A,
/// 1 reads M.
static COMP_MAP: phf::Map<&'static str, &'static str> = phf_map! {
    // a=0 (A register operations)
    "0" => "0101010",
    "1" => "0111111",
    "-1" => "0111010",
    "D" => "0001100",
    "A" => "0110000",
    "!D" => "0001101",
    "!A" => "0110001",
    "-D" => "0001111",
    "-A" => "0110011",
    "D+1" => "0011111",
    "A+1" => "0110111",
    "D-1" => "0001110",
    "A-1" => "0110010",
    "D+A" => "0000010",
    "D-A" => "0010011",
    "A-D" => "0000111",
    "D&A" => "0000000",
    "D|A" => "0010101",

    // a=1 (M register operations)
    "M" => "1110000",
    "!M" => "1110001",
    "-M" => "1110011",
    "M+1" => "1110111",
    "M-1" => "1110010",
    "D+M" => "1000010",
    "D-M" => "1010011",
    "M-D" => "1000111",
    "D&M" => "1000000",
    "D|M" => "1010101",
};

/// Jump mnemonic to its 3-bit field.
///
/// The empty string means no jump.
static JUMP_MAP: phf::Map<&'static str, &'static str> = phf_map! {
    "" => "000",
    "JGT" => "001",
    "JEQ" => "010",
    "JGE" => "011",
    "JLT" => "100",
    "JNE" => "101",
    "JLE" => "110",
    "JMP" => "111",
};

/// A mnemonic that is not part of the Hack instruction set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    UnknownDest(String),
    UnknownComp(String),
    UnknownJump(String),
}

impl std::error::Error for CodeError {}

impl fmt::Display for CodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDest(m) => write!(f, "unknown dest mnemonic \"{m}\""),
            Self::UnknownComp(m) => write!(f, "unknown comp mnemonic \"{m}\""),
            Self::UnknownJump(m) => write!(f, "unknown jump mnemonic \"{m}\""),
        }
    }
}

/// Translates a destination mnemonic to its 3-bit field.
#[inline]
pub fn dest(mnemonic: &str) -> Result<&'static str, CodeError> {
    DEST_MAP
        .get(mnemonic)
        .copied()
        .ok_or_else(|| CodeError::UnknownDest(mnemonic.to_string()))
}

/// Translates a computation mnemonic to its 7-bit field.
#[inline]
pub fn comp(mnemonic: &str) -> Result<&'static str, CodeError> {
    COMP_MAP
        .get(mnemonic)
        .copied()
        .ok_or_else(|| CodeError::UnknownComp(mnemonic.to_string()))
}

/// Translates a jump mnemonic to its 3-bit field.
#[inline]
pub fn jump(mnemonic: &str) -> Result<&'static str, CodeError> {
    JUMP_MAP
        .get(mnemonic)
        .copied()
        .ok_or_else(|| CodeError::UnknownJump(mnemonic.to_string()))
}

/// Encodes a complete C-instruction: `111` + comp (7) + dest (3) + jump (3).
///
/// # Example
/// ```
/// use assembler::code::encode_c_instruction;
/// let instruction = encode_c_instruction("D", "D+1", "").unwrap();
/// assert_eq!(instruction, "1110011111010000");
/// ```
#[inline]
pub fn encode_c_instruction(
    dest_mnemonic: &str,
    comp_mnemonic: &str,
    jump_mnemonic: &str,
) -> Result<String, CodeError> {
    Ok(format!(
        "111{}{}{}",
        comp(comp_mnemonic)?,
        dest(dest_mnemonic)?,
        jump(jump_mnemonic)?
    ))
}

/// Encodes an A-instruction: a zero bit followed by the 15-bit address.
///
/// # Example
/// ```
/// use assembler::code::encode_a_instruction;
/// assert_eq!(encode_a_instruction(100), "0000000001100100");
/// ```
#[inline]
#[must_use]
pub fn encode_a_instruction(address: u16) -> String {
    format!("{address:016b}")
}
