//! Recursive-descent compiler for Jack.
//!
//! Single pass, no syntax tree: every grammar production emits its VM
//! code as it is recognized. One token of lookahead is enough
//! everywhere except the identifier-led terms (`x`, `x[i]`, `f(...)`,
//! `obj.f(...)`), where the identifier is consumed first and the next
//! token picks the production.
//!
//! Expressions are compiled strictly left to right with no operator
//! precedence, matching the reference compiler: `1 + 2 * 3` computes
//! `(1 + 2) * 3`.

use std::fmt;
use std::io::{self, Write};

use crate::symbol_table::{Kind, SymbolTable};
use crate::tokenizer::{Keyword, Token, TokenizeError, Tokenizer};
use crate::vm_writer::{Command, Segment, VmWriter};

#[derive(Debug)]
pub enum CompileError {
    Lex(TokenizeError),
    Syntax(String),
    /// Input ended in the middle of a construct.
    UnexpectedEof,
    /// Identifier used as a variable without a declaration in scope.
    UndefinedVariable(String),
    Io(io::Error),
}

impl std::error::Error for CompileError {}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(e) => e.fmt(f),
            Self::Syntax(msg) => write!(f, "syntax error: {msg}"),
            Self::UnexpectedEof => write!(f, "syntax error: unexpected end of file"),
            Self::UndefinedVariable(name) => write!(f, "undefined variable \"{name}\""),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl From<TokenizeError> for CompileError {
    fn from(e: TokenizeError) -> Self {
        Self::Lex(e)
    }
}

impl From<io::Error> for CompileError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

pub struct CompilationEngine<W: Write> {
    tokenizer: Tokenizer,
    writer: VmWriter<W>,
    class_table: SymbolTable,
    subroutine_table: SymbolTable,
    class_name: Option<String>,
    /// Mints `L0, L1, ...`, unique per compilation unit.
    label_counter: usize,
    /// Set once the token stream runs dry; reading past it is a
    /// syntax error, not a crash.
    exhausted: bool,
}

impl<W: Write> CompilationEngine<W> {
    /// Primes the engine with the first token.
    ///
    /// A source with no tokens at all (empty file, or comments only)
    /// is rejected here.
    pub fn new(source: &str, out: W) -> Result<Self, CompileError> {
        let mut tokenizer = Tokenizer::new(source);
        if !tokenizer.has_more_tokens()? {
            return Err(CompileError::Syntax("file is empty".to_string()));
        }
        tokenizer.advance()?;

        Ok(Self {
            tokenizer,
            writer: VmWriter::new(out),
            class_table: SymbolTable::new(),
            subroutine_table: SymbolTable::new(),
            class_name: None,
            label_counter: 0,
            exhausted: false,
        })
    }

    /// `class Name { classVarDec* subroutineDec* }`
    pub fn compile_class(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::Class)?;
        let name = self.expect_identifier()?;
        self.class_name = Some(name);
        self.expect_symbol('{')?;

        while self.at_keyword(Keyword::Static) || self.at_keyword(Keyword::Field) {
            self.compile_class_var_dec()?;
        }
        while self.at_subroutine_start() {
            self.compile_subroutine()?;
        }

        self.expect_symbol('}')?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), CompileError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_writer(self) -> VmWriter<W> {
        self.writer
    }

    /// `(static | field) type name (, name)* ;`: declarations only,
    /// nothing is emitted.
    fn compile_class_var_dec(&mut self) -> Result<(), CompileError> {
        let kind = if self.at_keyword(Keyword::Static) {
            Kind::Static
        } else {
            Kind::Field
        };
        self.bump()?;

        let type_name = self.expect_type()?;
        loop {
            let name = self.expect_identifier()?;
            self.class_table.define(&name, &type_name, kind);
            if self.at_symbol(',') {
                self.bump()?;
            } else {
                break;
            }
        }
        self.expect_symbol(';')?;
        Ok(())
    }

    /// `(constructor | function | method) (void | type) name (params) body`
    ///
    /// The function header is emitted only after the `var` declarations
    /// are counted; methods then bind `this` from argument 0 and
    /// constructors allocate the object.
    fn compile_subroutine(&mut self) -> Result<(), CompileError> {
        let kind = self.tokenizer.keyword()?;
        self.bump()?;

        if self.at_keyword(Keyword::Void) {
            self.bump()?;
        } else {
            self.expect_type()?;
        }
        let name = self.expect_identifier()?;

        self.subroutine_table.reset();
        if kind == Keyword::Method {
            // `this` occupies argument 0; user parameters start at 1
            let class_name = self.current_class()?.to_string();
            self.subroutine_table.define("this", &class_name, Kind::Arg);
        }

        self.expect_symbol('(')?;
        self.compile_parameter_list()?;
        self.expect_symbol(')')?;
        self.expect_symbol('{')?;

        while self.at_keyword(Keyword::Var) {
            self.compile_var_dec()?;
        }

        let full_name = format!("{}.{name}", self.current_class()?);
        let n_locals = self.subroutine_table.var_count(Kind::Var);
        self.writer.write_function(&full_name, n_locals)?;

        match kind {
            Keyword::Method => {
                self.writer.write_push(Segment::Argument, 0)?;
                self.writer.write_pop(Segment::Pointer, 0)?;
            }
            Keyword::Constructor => {
                let n_fields = self.class_table.var_count(Kind::Field);
                self.writer.write_push(Segment::Constant, n_fields)?;
                self.writer.write_call("Memory.alloc", 1)?;
                self.writer.write_pop(Segment::Pointer, 0)?;
            }
            _ => {}
        }

        self.compile_statements()?;
        self.expect_symbol('}')?;
        Ok(())
    }

    /// `((type name) (, type name)*)?`
    fn compile_parameter_list(&mut self) -> Result<(), CompileError> {
        if self.at_symbol(')') {
            return Ok(());
        }
        loop {
            let type_name = self.expect_type()?;
            let name = self.expect_identifier()?;
            self.subroutine_table.define(&name, &type_name, Kind::Arg);
            if self.at_symbol(',') {
                self.bump()?;
            } else {
                return Ok(());
            }
        }
    }

    /// `var type name (, name)* ;`
    fn compile_var_dec(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::Var)?;
        let type_name = self.expect_type()?;
        loop {
            let name = self.expect_identifier()?;
            self.subroutine_table.define(&name, &type_name, Kind::Var);
            if self.at_symbol(',') {
                self.bump()?;
            } else {
                break;
            }
        }
        self.expect_symbol(';')?;
        Ok(())
    }

    fn compile_statements(&mut self) -> Result<(), CompileError> {
        loop {
            if self.at_keyword(Keyword::Let) {
                self.compile_let()?;
            } else if self.at_keyword(Keyword::If) {
                self.compile_if()?;
            } else if self.at_keyword(Keyword::While) {
                self.compile_while()?;
            } else if self.at_keyword(Keyword::Do) {
                self.compile_do()?;
            } else if self.at_keyword(Keyword::Return) {
                self.compile_return()?;
            } else {
                return Ok(());
            }
        }
    }

    /// `let name ([expr])? = expr ;`
    ///
    /// For an array target the address `name + index` is computed
    /// before the right-hand side, parked while the right-hand side
    /// runs (it may rebind `that` itself), then restored into
    /// `pointer 1` for the final store.
    fn compile_let(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::Let)?;
        let name = self.expect_identifier()?;
        let (segment, index) = self.resolve_variable(&name)?;

        let is_array = self.at_symbol('[');
        if is_array {
            self.expect_symbol('[')?;
            self.writer.write_push(segment, index)?;
            self.compile_expression()?;
            self.writer.write_arithmetic(Command::Add)?;
            self.expect_symbol(']')?;
        }

        self.expect_symbol('=')?;
        self.compile_expression()?;

        if is_array {
            self.writer.write_pop(Segment::Temp, 0)?;
            self.writer.write_pop(Segment::Pointer, 1)?;
            self.writer.write_push(Segment::Temp, 0)?;
            self.writer.write_pop(Segment::That, 0)?;
        } else {
            self.writer.write_pop(segment, index)?;
        }

        self.expect_symbol(';')?;
        Ok(())
    }

    /// `if (expr) { statements } (else { statements })?`
    fn compile_if(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::If)?;
        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;
        self.expect_symbol('{')?;

        self.writer.write_arithmetic(Command::Not)?;
        let label_if = self.fresh_label();
        self.writer.write_if(&label_if)?;

        self.compile_statements()?;
        self.expect_symbol('}')?;

        if !self.at_keyword(Keyword::Else) {
            self.writer.write_label(&label_if)?;
            return Ok(());
        }

        let label_else = self.fresh_label();
        self.writer.write_goto(&label_else)?;
        self.writer.write_label(&label_if)?;

        self.expect_keyword(Keyword::Else)?;
        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;
        self.writer.write_label(&label_else)?;
        Ok(())
    }

    /// `while (expr) { statements }`
    fn compile_while(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::While)?;
        self.expect_symbol('(')?;

        let label_start = self.fresh_label();
        self.writer.write_label(&label_start)?;

        self.compile_expression()?;
        self.expect_symbol(')')?;
        self.expect_symbol('{')?;

        self.writer.write_arithmetic(Command::Not)?;
        let label_end = self.fresh_label();
        self.writer.write_if(&label_end)?;

        self.compile_statements()?;
        self.writer.write_goto(&label_start)?;

        self.expect_symbol('}')?;
        self.writer.write_label(&label_end)?;
        Ok(())
    }

    /// `do expr ;`; the call's return value is discarded.
    fn compile_do(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::Do)?;
        self.compile_expression()?;
        self.writer.write_pop(Segment::Temp, 0)?;
        self.expect_symbol(';')?;
        Ok(())
    }

    /// `return expr? ;`; void subroutines still return a value slot.
    fn compile_return(&mut self) -> Result<(), CompileError> {
        self.expect_keyword(Keyword::Return)?;
        if self.at_symbol(';') {
            self.writer.write_push(Segment::Constant, 0)?;
        } else {
            self.compile_expression()?;
        }
        self.expect_symbol(';')?;
        self.writer.write_return()?;
        Ok(())
    }

    /// `term (op term)*`, left-associative, no precedence.
    fn compile_expression(&mut self) -> Result<(), CompileError> {
        self.compile_term()?;
        loop {
            let op = match self.tokenizer.current() {
                Some(Token::Symbol(c)) if !self.exhausted && BINARY_OPS.contains(*c) => *c,
                _ => return Ok(()),
            };
            self.bump()?;
            self.compile_term()?;
            match op {
                '+' => self.writer.write_arithmetic(Command::Add)?,
                '-' => self.writer.write_arithmetic(Command::Sub)?,
                '&' => self.writer.write_arithmetic(Command::And)?,
                '|' => self.writer.write_arithmetic(Command::Or)?,
                '<' => self.writer.write_arithmetic(Command::Lt)?,
                '>' => self.writer.write_arithmetic(Command::Gt)?,
                '=' => self.writer.write_arithmetic(Command::Eq)?,
                '*' => self.writer.write_call("Math.multiply", 2)?,
                _ => self.writer.write_call("Math.divide", 2)?,
            }
        }
    }

    /// `(expr (, expr)*)?`; returns the argument count.
    fn compile_expression_list(&mut self) -> Result<u16, CompileError> {
        if self.at_symbol(')') {
            return Ok(0);
        }
        let mut count = 1;
        self.compile_expression()?;
        while self.at_symbol(',') {
            self.bump()?;
            self.compile_expression()?;
            count += 1;
        }
        Ok(count)
    }

    fn compile_term(&mut self) -> Result<(), CompileError> {
        let token = self.current()?.clone();
        match token {
            Token::IntConst(n) => {
                self.bump()?;
                self.writer.write_push(Segment::Constant, n)?;
            }
            Token::StringConst(s) => {
                self.bump()?;
                self.compile_string_constant(&s)?;
            }
            Token::Keyword(Keyword::True) => {
                self.bump()?;
                self.writer.write_push(Segment::Constant, 0)?;
                self.writer.write_arithmetic(Command::Not)?;
            }
            Token::Keyword(Keyword::False | Keyword::Null) => {
                self.bump()?;
                self.writer.write_push(Segment::Constant, 0)?;
            }
            Token::Keyword(Keyword::This) => {
                self.bump()?;
                self.writer.write_push(Segment::Pointer, 0)?;
            }
            Token::Symbol('(') => {
                self.bump()?;
                self.compile_expression()?;
                self.expect_symbol(')')?;
            }
            Token::Symbol('-') => {
                self.bump()?;
                self.compile_term()?;
                self.writer.write_arithmetic(Command::Neg)?;
            }
            Token::Symbol('~') => {
                self.bump()?;
                self.compile_term()?;
                self.writer.write_arithmetic(Command::Not)?;
            }
            Token::Identifier(name) => {
                self.bump()?;
                self.compile_identifier_term(&name)?;
            }
            _ => return Err(self.syntax_error("expected a term")),
        }
        Ok(())
    }

    /// The identifier has been consumed; the next token decides between
    /// array access, the two call forms, and a plain variable read.
    fn compile_identifier_term(&mut self, name: &str) -> Result<(), CompileError> {
        if self.at_symbol('[') {
            // name[expr]: *(name + expr) through the `that` pointer
            let (segment, index) = self.resolve_variable(name)?;
            self.expect_symbol('[')?;
            self.writer.write_push(segment, index)?;
            self.compile_expression()?;
            self.expect_symbol(']')?;
            self.writer.write_arithmetic(Command::Add)?;
            self.writer.write_pop(Segment::Pointer, 1)?;
            self.writer.write_push(Segment::That, 0)?;
        } else if self.at_symbol('(') {
            // name(args): method call on the current object
            let callee = format!("{}.{name}", self.current_class()?);
            self.expect_symbol('(')?;
            self.writer.write_push(Segment::Pointer, 0)?;
            let n_args = self.compile_expression_list()?;
            self.expect_symbol(')')?;
            self.writer.write_call(&callee, n_args + 1)?;
        } else if self.at_symbol('.') {
            // obj.method(args) when obj is a variable, else Class.function(args)
            self.expect_symbol('.')?;
            let method = self.expect_identifier()?;
            let (callee, receiver_args) = match self.resolve_object(name) {
                Some((segment, index, type_name)) => {
                    self.writer.write_push(segment, index)?;
                    (format!("{type_name}.{method}"), 1)
                }
                None => (format!("{name}.{method}"), 0),
            };
            self.expect_symbol('(')?;
            let n_args = self.compile_expression_list()?;
            self.expect_symbol(')')?;
            self.writer.write_call(&callee, n_args + receiver_args)?;
        } else {
            let (segment, index) = self.resolve_variable(name)?;
            self.writer.write_push(segment, index)?;
        }
        Ok(())
    }

    /// Builds the string at runtime: `String.new` then one
    /// `String.appendChar` per character. `appendChar` returns the
    /// string, so the builder stays on the stack throughout.
    fn compile_string_constant(&mut self, value: &str) -> Result<(), CompileError> {
        let length = u16::try_from(value.chars().count())
            .map_err(|_| CompileError::Syntax("string constant too long".to_string()))?;
        self.writer.write_push(Segment::Constant, length)?;
        self.writer.write_call("String.new", 1)?;
        for c in value.chars() {
            self.writer.write_push(Segment::Constant, c as u16)?;
            self.writer.write_call("String.appendChar", 2)?;
        }
        Ok(())
    }

    // --- token-stream helpers ---

    fn current(&self) -> Result<&Token, CompileError> {
        if self.exhausted {
            return Err(CompileError::UnexpectedEof);
        }
        self.tokenizer.current().ok_or(CompileError::UnexpectedEof)
    }

    /// Moves past the current token; at the end of input the engine is
    /// marked exhausted instead, so a later read reports EOF cleanly.
    fn bump(&mut self) -> Result<(), CompileError> {
        if self.tokenizer.has_more_tokens()? {
            self.tokenizer.advance()?;
        } else {
            self.exhausted = true;
        }
        Ok(())
    }

    fn at_symbol(&self, symbol: char) -> bool {
        !self.exhausted
            && matches!(self.tokenizer.current(), Some(Token::Symbol(c)) if *c == symbol)
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        !self.exhausted
            && matches!(self.tokenizer.current(), Some(Token::Keyword(k)) if *k == keyword)
    }

    fn at_subroutine_start(&self) -> bool {
        self.at_keyword(Keyword::Constructor)
            || self.at_keyword(Keyword::Function)
            || self.at_keyword(Keyword::Method)
    }

    fn expect_symbol(&mut self, symbol: char) -> Result<(), CompileError> {
        if self.at_symbol(symbol) {
            self.bump()
        } else {
            Err(self.syntax_error(&format!("expected '{symbol}'")))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), CompileError> {
        if self.at_keyword(keyword) {
            self.bump()
        } else {
            Err(self.syntax_error(&format!("expected \"{}\"", keyword.as_str())))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, CompileError> {
        let name = match self.current()? {
            Token::Identifier(s) => s.clone(),
            _ => return Err(self.syntax_error("expected an identifier")),
        };
        self.bump()?;
        Ok(name)
    }

    /// `int`, `char`, `boolean`, or a class name.
    fn expect_type(&mut self) -> Result<String, CompileError> {
        let type_name = match self.current()? {
            Token::Keyword(k @ (Keyword::Int | Keyword::Char | Keyword::Boolean)) => {
                k.as_str().to_string()
            }
            Token::Identifier(s) => s.clone(),
            _ => return Err(self.syntax_error("expected a type")),
        };
        self.bump()?;
        Ok(type_name)
    }

    fn syntax_error(&self, expected: &str) -> CompileError {
        let found = if self.exhausted {
            "end of file".to_string()
        } else {
            self.tokenizer
                .current()
                .map_or_else(|| "end of file".to_string(), ToString::to_string)
        };
        CompileError::Syntax(format!("{expected}, found \"{found}\""))
    }

    // --- symbol and label helpers ---

    fn current_class(&self) -> Result<&str, CompileError> {
        self.class_name
            .as_deref()
            .ok_or_else(|| CompileError::Syntax("subroutine outside of a class".to_string()))
    }

    fn fresh_label(&mut self) -> String {
        let label = format!("L{}", self.label_counter);
        self.label_counter += 1;
        label
    }

    /// Subroutine scope shadows class scope.
    fn find_symbol(&self, name: &str) -> Option<&crate::symbol_table::SymbolInfo> {
        self.subroutine_table
            .get(name)
            .or_else(|| self.class_table.get(name))
    }

    fn resolve_variable(&self, name: &str) -> Result<(Segment, u16), CompileError> {
        self.find_symbol(name)
            .map(|info| (Segment::from(info.kind), info.index))
            .ok_or_else(|| CompileError::UndefinedVariable(name.to_string()))
    }

    fn resolve_object(&self, name: &str) -> Option<(Segment, u16, String)> {
        self.find_symbol(name)
            .map(|info| (Segment::from(info.kind), info.index, info.type_name.clone()))
    }
}

const BINARY_OPS: &str = "+-*/&|<>=";
