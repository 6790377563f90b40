//! Line-oriented reader for VM commands.
//!
//! The whole file is read up front with comments and blank lines
//! stripped, then consumed one command at a time. The first word of a
//! line fixes the command kind through a compile-time table; `arg1` and
//! `arg2` read the operands the kind allows.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use phf::phf_map;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Arithmetic,
    Push,
    Pop,
    Label,
    Goto,
    If,
    Function,
    Return,
    Call,
}

/// First word of a line to its command kind.
static COMMAND_KINDS: phf::Map<&'static str, CommandType> = phf_map! {
    "add" => CommandType::Arithmetic,
    "sub" => CommandType::Arithmetic,
    "neg" => CommandType::Arithmetic,
    "eq" => CommandType::Arithmetic,
    "gt" => CommandType::Arithmetic,
    "lt" => CommandType::Arithmetic,
    "and" => CommandType::Arithmetic,
    "or" => CommandType::Arithmetic,
    "not" => CommandType::Arithmetic,
    "push" => CommandType::Push,
    "pop" => CommandType::Pop,
    "label" => CommandType::Label,
    "goto" => CommandType::Goto,
    "if-goto" => CommandType::If,
    "function" => CommandType::Function,
    "return" => CommandType::Return,
    "call" => CommandType::Call,
};

#[derive(Debug)]
pub enum ParseError {
    Io(io::Error),
    /// First word of a line is not a VM command.
    UnknownCommand(String),
    /// Command is missing a required operand.
    MissingArgument(String),
    /// Third operand is not a non-negative integer.
    InvalidIndex(String),
}

impl std::error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::UnknownCommand(cmd) => write!(f, "unknown VM command \"{cmd}\""),
            Self::MissingArgument(line) => write!(f, "missing argument in \"{line}\""),
            Self::InvalidIndex(line) => write!(f, "invalid integer argument in \"{line}\""),
        }
    }
}

impl From<io::Error> for ParseError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

pub struct Parser {
    lines: Vec<String>,
    next_line: usize,
    current_command: String,
    /// Whitespace-split words of the current command.
    parts: Vec<String>,
}

impl Parser {
    pub fn new(path: &Path) -> Result<Self, ParseError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let code = line.split("//").next().unwrap_or("").trim();
            if !code.is_empty() {
                lines.push(code.to_string());
            }
        }

        Ok(Self {
            lines,
            next_line: 0,
            current_command: String::new(),
            parts: Vec::new(),
        })
    }

    #[must_use]
    pub fn has_more_commands(&self) -> bool {
        self.next_line < self.lines.len()
    }

    pub fn advance(&mut self) {
        if self.has_more_commands() {
            std::mem::swap(&mut self.current_command, &mut self.lines[self.next_line]);
            self.parts.clear();
            self.parts
                .extend(self.current_command.split_whitespace().map(str::to_string));
            self.next_line += 1;
        }
    }

    /// The raw text of the current command, for comment echoes.
    #[must_use]
    pub fn current_command(&self) -> &str {
        &self.current_command
    }

    pub fn command_type(&self) -> Result<CommandType, ParseError> {
        let word = self
            .parts
            .first()
            .ok_or_else(|| ParseError::UnknownCommand(String::new()))?;
        COMMAND_KINDS
            .get(word.as_str())
            .copied()
            .ok_or_else(|| ParseError::UnknownCommand(word.clone()))
    }

    /// First operand; for arithmetic commands, the command itself.
    pub fn arg1(&self) -> Result<&str, ParseError> {
        let index = match self.command_type()? {
            CommandType::Arithmetic => 0,
            _ => 1,
        };
        self.parts
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| ParseError::MissingArgument(self.current_command.clone()))
    }

    /// Second operand, present on `push`/`pop`/`function`/`call`.
    pub fn arg2(&self) -> Result<u16, ParseError> {
        self.parts
            .get(2)
            .ok_or_else(|| ParseError::MissingArgument(self.current_command.clone()))?
            .parse()
            .map_err(|_| ParseError::InvalidIndex(self.current_command.clone()))
    }
}
