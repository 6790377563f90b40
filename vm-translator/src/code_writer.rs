//! Lowers VM commands to Hack assembly.
//!
//! The writer owns the output stream plus the little state the
//! translation needs: a label counter for comparisons, a return-label
//! counter for call sites, the current file stem (static addressing)
//! and the current function (label scoping).

use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use phf::phf_map;

// Writes a fixed sequence of assembly lines in one call.
macro_rules! write_asm {
    ($writer:expr, $($line:literal)*) => {
        $writer.write_all(concat!($($line, "\n"),*).as_bytes())
    };
}

/// The eight VM memory segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Local,
    Argument,
    This,
    That,
    Pointer,
    Temp,
    Static,
    Constant,
}

static SEGMENTS: phf::Map<&'static str, Segment> = phf_map! {
    "local" => Segment::Local,
    "argument" => Segment::Argument,
    "this" => Segment::This,
    "that" => Segment::That,
    "pointer" => Segment::Pointer,
    "temp" => Segment::Temp,
    "static" => Segment::Static,
    "constant" => Segment::Constant,
};

impl Segment {
    /// Base pointer symbol for the four indirectly addressed segments.
    fn base(self) -> &'static str {
        match self {
            Segment::Local => "LCL",
            Segment::Argument => "ARG",
            Segment::This => "THIS",
            Segment::That => "THAT",
            _ => unreachable!("segment has no base pointer"),
        }
    }

    fn is_indirect(self) -> bool {
        matches!(
            self,
            Segment::Local | Segment::Argument | Segment::This | Segment::That
        )
    }
}

#[derive(Debug)]
pub enum WriterError {
    Io(io::Error),
    UnknownArithmetic(String),
    UnknownSegment(String),
    /// `pointer` only has slots 0 (THIS) and 1 (THAT).
    PointerIndexOutOfRange(u16),
    /// `temp` covers R5..R12.
    TempIndexOutOfRange(u16),
    PopConstant,
}

impl std::error::Error for WriterError {}

impl fmt::Display for WriterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::UnknownArithmetic(cmd) => write!(f, "unknown arithmetic command \"{cmd}\""),
            Self::UnknownSegment(seg) => write!(f, "unknown segment \"{seg}\""),
            Self::PointerIndexOutOfRange(i) => write!(f, "pointer index {i} out of range (0-1)"),
            Self::TempIndexOutOfRange(i) => write!(f, "temp index {i} out of range (0-7)"),
            Self::PopConstant => write!(f, "cannot pop to the constant segment"),
        }
    }
}

impl From<io::Error> for WriterError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

pub struct CodeWriter<W: Write> {
    out: W,
    label_counter: usize,
    return_counter: usize,
    file_stem: String,
    current_function: Option<String>,
}

impl<W: Write> CodeWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            label_counter: 0,
            return_counter: 0,
            file_stem: String::new(),
            current_function: None,
        }
    }

    /// Starts a new translation unit: updates the stem used for static
    /// symbols and forgets the current function.
    pub fn set_input_file(&mut self, path: &Path) {
        self.file_stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown")
            .to_string();
        self.current_function = None;
    }

    /// Echoes the source VM command above its translation.
    pub fn write_comment(&mut self, text: &str) -> Result<(), WriterError> {
        writeln!(self.out, "// {text}")?;
        Ok(())
    }

    pub fn write_arithmetic(&mut self, command: &str) -> Result<(), WriterError> {
        match command {
            "add" => self.write_binary_op("D+M"),
            "sub" => self.write_binary_op("M-D"),
            "and" => self.write_binary_op("D&M"),
            "or" => self.write_binary_op("D|M"),
            "neg" => self.write_unary_op("-M"),
            "not" => self.write_unary_op("!M"),
            "eq" => self.write_comparison("JEQ"),
            "gt" => self.write_comparison("JGT"),
            "lt" => self.write_comparison("JLT"),
            _ => Err(WriterError::UnknownArithmetic(command.to_string())),
        }
    }

    /// Pops y into D, then combines with x in place at the new stack top.
    fn write_binary_op(&mut self, operation: &str) -> Result<(), WriterError> {
        write_asm!(self.out,
            "@SP"
            "AM=M-1"
            "D=M"
            "A=A-1"
        )?;
        writeln!(self.out, "M={operation}")?;
        Ok(())
    }

    fn write_unary_op(&mut self, operation: &str) -> Result<(), WriterError> {
        write_asm!(self.out,
            "@SP"
            "A=M-1"
        )?;
        writeln!(self.out, "M={operation}")?;
        Ok(())
    }

    /// Computes `D = x - y` and branches to set the top of the stack to
    /// all-ones (true) or zero.
    fn write_comparison(&mut self, jump: &str) -> Result<(), WriterError> {
        let n = self.label_counter;
        self.label_counter += 1;

        write_asm!(self.out,
            "@SP"
            "AM=M-1"
            "D=M"
            "A=A-1"
            "D=M-D"
        )?;
        writeln!(self.out, "@COMP_TRUE_{n}")?;
        writeln!(self.out, "D;{jump}")?;
        write_asm!(self.out,
            "@SP"
            "A=M-1"
            "M=0"
        )?;
        writeln!(self.out, "@COMP_END_{n}")?;
        writeln!(self.out, "0;JMP")?;
        writeln!(self.out, "(COMP_TRUE_{n})")?;
        write_asm!(self.out,
            "@SP"
            "A=M-1"
            "M=-1"
        )?;
        writeln!(self.out, "(COMP_END_{n})")?;
        Ok(())
    }

    pub fn write_push(&mut self, segment: &str, index: u16) -> Result<(), WriterError> {
        let segment = Self::segment(segment)?;
        match segment {
            Segment::Constant => {
                writeln!(self.out, "@{index}")?;
                writeln!(self.out, "D=A")?;
            }
            seg if seg.is_indirect() => {
                writeln!(self.out, "@{index}")?;
                writeln!(self.out, "D=A")?;
                writeln!(self.out, "@{}", seg.base())?;
                writeln!(self.out, "A=D+M")?;
                writeln!(self.out, "D=M")?;
            }
            Segment::Pointer => {
                writeln!(self.out, "@{}", Self::pointer_register(index)?)?;
                writeln!(self.out, "D=M")?;
            }
            Segment::Temp => {
                writeln!(self.out, "@{}", Self::temp_register(index)?)?;
                writeln!(self.out, "D=M")?;
            }
            Segment::Static => {
                writeln!(self.out, "@{}.{index}", self.file_stem)?;
                writeln!(self.out, "D=M")?;
            }
            _ => unreachable!(),
        }
        self.write_push_d()
    }

    pub fn write_pop(&mut self, segment: &str, index: u16) -> Result<(), WriterError> {
        let segment = Self::segment(segment)?;
        match segment {
            Segment::Constant => return Err(WriterError::PopConstant),
            seg if seg.is_indirect() => {
                // Target address into R13, then pop into it
                writeln!(self.out, "@{index}")?;
                writeln!(self.out, "D=A")?;
                writeln!(self.out, "@{}", seg.base())?;
                writeln!(self.out, "D=D+M")?;
                write_asm!(self.out,
                    "@R13"
                    "M=D"
                )?;
                self.write_pop_to_d()?;
                write_asm!(self.out,
                    "@R13"
                    "A=M"
                    "M=D"
                )?;
            }
            Segment::Pointer => {
                let register = Self::pointer_register(index)?;
                self.write_pop_to_d()?;
                writeln!(self.out, "@{register}")?;
                writeln!(self.out, "M=D")?;
            }
            Segment::Temp => {
                let register = Self::temp_register(index)?;
                self.write_pop_to_d()?;
                writeln!(self.out, "@{register}")?;
                writeln!(self.out, "M=D")?;
            }
            Segment::Static => {
                self.write_pop_to_d()?;
                writeln!(self.out, "@{}.{index}", self.file_stem)?;
                writeln!(self.out, "M=D")?;
            }
            _ => unreachable!(),
        }
        Ok(())
    }

    pub fn write_label(&mut self, label: &str) -> Result<(), WriterError> {
        let scoped = self.scoped_label(label);
        writeln!(self.out, "({scoped})")?;
        Ok(())
    }

    pub fn write_goto(&mut self, label: &str) -> Result<(), WriterError> {
        let scoped = self.scoped_label(label);
        writeln!(self.out, "@{scoped}")?;
        writeln!(self.out, "0;JMP")?;
        Ok(())
    }

    /// Pops the top of the stack and jumps when it is non-zero.
    pub fn write_if(&mut self, label: &str) -> Result<(), WriterError> {
        let scoped = self.scoped_label(label);
        self.write_pop_to_d()?;
        writeln!(self.out, "@{scoped}")?;
        writeln!(self.out, "D;JNE")?;
        Ok(())
    }

    pub fn write_function(&mut self, name: &str, n_locals: u16) -> Result<(), WriterError> {
        self.current_function = Some(name.to_string());
        writeln!(self.out, "({name})")?;
        for _ in 0..n_locals {
            self.write_push("constant", 0)?;
        }
        Ok(())
    }

    /// Builds the callee frame: saved return address and segment
    /// pointers, `ARG = SP-5-nArgs`, `LCL = SP`, then jumps.
    pub fn write_call(&mut self, name: &str, n_args: u16) -> Result<(), WriterError> {
        let return_label = format!("{name}$ret.{}", self.return_counter);
        self.return_counter += 1;

        writeln!(self.out, "@{return_label}")?;
        writeln!(self.out, "D=A")?;
        self.write_push_d()?;
        for pointer in ["LCL", "ARG", "THIS", "THAT"] {
            writeln!(self.out, "@{pointer}")?;
            writeln!(self.out, "D=M")?;
            self.write_push_d()?;
        }
        write_asm!(self.out,
            "@SP"
            "D=M"
            "@5"
            "D=D-A"
        )?;
        writeln!(self.out, "@{n_args}")?;
        write_asm!(self.out,
            "D=D-A"
            "@ARG"
            "M=D"
            "@SP"
            "D=M"
            "@LCL"
            "M=D"
        )?;
        writeln!(self.out, "@{name}")?;
        writeln!(self.out, "0;JMP")?;
        writeln!(self.out, "({return_label})")?;
        Ok(())
    }

    /// Unwinds the callee frame: R13 walks down the saved pointers,
    /// R14 carries the return address.
    pub fn write_return(&mut self) -> Result<(), WriterError> {
        // frame = LCL
        write_asm!(self.out,
            "@LCL"
            "D=M"
            "@R13"
            "M=D"
        )?;
        // retAddr = *(frame - 5)
        write_asm!(self.out,
            "@R13"
            "D=M"
            "@5"
            "D=D-A"
            "A=D"
            "D=M"
            "@R14"
            "M=D"
        )?;
        // *ARG = pop()
        self.write_pop_to_d()?;
        write_asm!(self.out,
            "@ARG"
            "A=M"
            "M=D"
        )?;
        // SP = ARG + 1
        write_asm!(self.out,
            "@ARG"
            "D=M+1"
            "@SP"
            "M=D"
        )?;
        // Restore the caller's pointers, walking the frame downward
        for pointer in ["THAT", "THIS", "ARG", "LCL"] {
            write_asm!(self.out,
                "@R13"
                "AM=M-1"
                "D=M"
            )?;
            writeln!(self.out, "@{pointer}")?;
            writeln!(self.out, "M=D")?;
        }
        // goto retAddr
        write_asm!(self.out,
            "@R14"
            "A=M"
            "0;JMP"
        )?;
        Ok(())
    }

    /// `SP = 256`, then a standard call of `Sys.init`.
    pub fn write_bootstrap(&mut self) -> Result<(), WriterError> {
        write_asm!(self.out,
            "@256"
            "D=A"
            "@SP"
            "M=D"
        )?;
        self.write_call("Sys.init", 0)
    }

    /// Parks the machine in a spin loop after the translated program.
    pub fn write_epilogue(&mut self) -> Result<(), WriterError> {
        write_asm!(self.out,
            "(END)"
            "@END"
            "0;JMP"
        )?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), WriterError> {
        self.out.flush()?;
        Ok(())
    }

    /// `function$label` inside a function, `file$label` otherwise.
    fn scoped_label(&self, label: &str) -> String {
        match &self.current_function {
            Some(function) => format!("{function}${label}"),
            None => format!("{}${label}", self.file_stem),
        }
    }

    fn segment(name: &str) -> Result<Segment, WriterError> {
        SEGMENTS
            .get(name)
            .copied()
            .ok_or_else(|| WriterError::UnknownSegment(name.to_string()))
    }

    fn pointer_register(index: u16) -> Result<&'static str, WriterError> {
        match index {
            0 => Ok("THIS"),
            1 => Ok("THAT"),
            _ => Err(WriterError::PointerIndexOutOfRange(index)),
        }
    }

    fn temp_register(index: u16) -> Result<String, WriterError> {
        if index > 7 {
            return Err(WriterError::TempIndexOutOfRange(index));
        }
        Ok(format!("{}", 5 + index))
    }

    fn write_push_d(&mut self) -> Result<(), WriterError> {
        write_asm!(self.out,
            "@SP"
            "A=M"
            "M=D"
            "@SP"
            "M=M+1"
        )?;
        Ok(())
    }

    fn write_pop_to_d(&mut self) -> Result<(), WriterError> {
        write_asm!(self.out,
            "@SP"
            "AM=M-1"
            "D=M"
        )?;
        Ok(())
    }
}
