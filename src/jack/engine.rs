use log::trace;

use super::symbol_table::{SymbolKind, SymbolTable, SymbolTableEntry};
use super::tokenizer::Tokenizer;
use super::tokens::{Kind, Token};
use super::vm_writer::{Segment, VmCommand, VmWriter};
use crate::common::SpanError;

type CompileResult<T> = Result<T, SpanError>;

/// Compiles a single Jack class source buffer to VM code.
pub fn compile(src: &str) -> Result<String, SpanError> {
    Engine::new(src).compile()
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

/// Single-pass compilation engine: a recursive-descent parser over the token
/// stream that resolves identifiers against the two symbol-table scopes and
/// emits VM instructions as it goes. One token of lookahead (the current,
/// not-yet-consumed token) decides every production; no syntax tree is built.
pub struct Engine<'a> {
    tokenizer: Tokenizer<'a>,
    token: Token<'a>,
    writer: VmWriter,
    class_table: SymbolTable<'a>,
    sub_table: SymbolTable<'a>,
    class_name: &'a str,
    subroutine_name: &'a str,
    labels_claimed: usize,
}

impl<'a> Engine<'a> {
    pub fn new(src: &'a str) -> Engine<'a> {
        let mut tokenizer = Tokenizer::new(src);
        let token = tokenizer.next_token();
        Engine {
            tokenizer,
            token,
            writer: VmWriter::new(),
            class_table: SymbolTable::new(),
            sub_table: SymbolTable::new(),
            class_name: "",
            subroutine_name: "",
            labels_claimed: 0,
        }
    }

    /// Runs the `class` production to completion and returns the emitted VM
    /// code. The first error aborts the compilation.
    pub fn compile(mut self) -> Result<String, SpanError> {
        self.compile_class()?;
        Ok(self.writer.into_code())
    }

    fn compile_class(&mut self) -> CompileResult<()> {
        self.class_table.reset();
        self.sub_table.reset();

        self.expect_keyword(&["class"])?;
        self.class_name = self.expect_ident()?.kind.literal();
        self.expect_symbol("{")?;

        while let Kind::Keyword("static" | "field") = self.token.kind {
            self.compile_class_var_dec()?;
        }
        while let Kind::Keyword("constructor" | "function" | "method") = self.token.kind {
            self.compile_subroutine()?;
        }

        self.expect_symbol("}")?;
        if self.token.kind != Kind::EOF {
            return Err(self.unexpected("end of file"));
        }
        Ok(())
    }

    fn compile_class_var_dec(&mut self) -> CompileResult<()> {
        let kind = match self.token.kind {
            Kind::Keyword("static") => SymbolKind::Static,
            Kind::Keyword("field") => SymbolKind::Field,
            _ => return Err(self.unexpected("`static' or `field'")),
        };
        self.advance();

        let ty = self.expect_type()?.kind.literal();
        let name = self.expect_ident()?.kind.literal();
        self.class_table.add(kind, ty, name);

        while let Kind::Symbol(",") = self.token.kind {
            self.advance();
            let name = self.expect_ident()?.kind.literal();
            self.class_table.add(kind, ty, name);
        }

        self.expect_symbol(";")?;
        Ok(())
    }

    fn compile_subroutine(&mut self) -> CompileResult<()> {
        let kind = match self.token.kind {
            Kind::Keyword("constructor") => SubroutineKind::Constructor,
            Kind::Keyword("function") => SubroutineKind::Function,
            Kind::Keyword("method") => SubroutineKind::Method,
            _ => return Err(self.unexpected("`constructor', `function' or `method'")),
        };
        self.advance();

        self.sub_table.reset();
        if kind == SubroutineKind::Method {
            // The receiver is argument 0; `this` is a keyword, so the entry
            // can never collide with a user identifier.
            self.sub_table.add(SymbolKind::Arg, self.class_name, "this");
        }

        // Return type: `void` or a type
        match self.token.kind {
            Kind::Keyword("void") => {
                self.advance();
            }
            _ => {
                self.expect_type()?;
            }
        }

        self.subroutine_name = self.expect_ident()?.kind.literal();
        trace!("compiling {}.{}", self.class_name, self.subroutine_name);

        self.expect_symbol("(")?;
        self.compile_parameter_list()?;
        self.expect_symbol(")")?;
        self.expect_symbol("{")?;

        // All `var` declarations are consumed before any code is emitted so
        // the `function` header carries the final local count.
        while let Kind::Keyword("var") = self.token.kind {
            self.compile_var_dec()?;
        }

        let name = format!("{}.{}", self.class_name, self.subroutine_name);
        self.writer
            .function(&name, self.sub_table.count(SymbolKind::Var));

        match kind {
            SubroutineKind::Constructor => {
                self.writer
                    .push(Segment::Constant, self.class_table.count(SymbolKind::Field));
                self.writer.call("Memory.alloc", 1);
                self.writer.pop(Segment::Pointer, 0);
            }
            SubroutineKind::Method => {
                self.writer.push(Segment::Argument, 0);
                self.writer.pop(Segment::Pointer, 0);
            }
            SubroutineKind::Function => {}
        }

        self.compile_statements()?;
        self.expect_symbol("}")?;
        Ok(())
    }

    fn compile_parameter_list(&mut self) -> CompileResult<()> {
        while !matches!(self.token.kind, Kind::Symbol(")")) {
            let ty = self.expect_type()?.kind.literal();
            let name = self.expect_ident()?.kind.literal();
            self.sub_table.add(SymbolKind::Arg, ty, name);

            if let Kind::Symbol(",") = self.token.kind {
                self.advance();
            } else {
                break;
            }
        }
        Ok(())
    }

    fn compile_var_dec(&mut self) -> CompileResult<()> {
        self.expect_keyword(&["var"])?;

        let ty = self.expect_type()?.kind.literal();
        let name = self.expect_ident()?.kind.literal();
        self.sub_table.add(SymbolKind::Var, ty, name);

        while let Kind::Symbol(",") = self.token.kind {
            self.advance();
            let name = self.expect_ident()?.kind.literal();
            self.sub_table.add(SymbolKind::Var, ty, name);
        }

        self.expect_symbol(";")?;
        Ok(())
    }

    fn compile_statements(&mut self) -> CompileResult<()> {
        loop {
            match self.token.kind {
                Kind::Keyword("let") => self.compile_let()?,
                Kind::Keyword("if") => self.compile_if()?,
                Kind::Keyword("while") => self.compile_while()?,
                Kind::Keyword("do") => self.compile_do()?,
                Kind::Keyword("return") => self.compile_return()?,
                _ => return Ok(()),
            }
        }
    }

    fn compile_let(&mut self) -> CompileResult<()> {
        self.expect_keyword(&["let"])?;

        let target = self.expect_ident()?;
        let entry = self.lookup(&target)?;

        if let Kind::Symbol("[") = self.token.kind {
            // Indexed assignment. The value sits in temp 0 while the target
            // address moves into pointer 1; array reads on the right-hand
            // side re-target pointer 1 themselves.
            self.advance();
            self.writer.push(entry.kind.segment(), entry.index);
            self.compile_expression()?;
            self.expect_symbol("]")?;
            self.writer.command(VmCommand::Add);

            self.expect_symbol("=")?;
            self.compile_expression()?;

            self.writer.pop(Segment::Temp, 0);
            self.writer.pop(Segment::Pointer, 1);
            self.writer.push(Segment::Temp, 0);
            self.writer.pop(Segment::That, 0);
        } else {
            self.expect_symbol("=")?;
            self.compile_expression()?;
            self.writer.pop(entry.kind.segment(), entry.index);
        }

        self.expect_symbol(";")?;
        Ok(())
    }

    fn compile_if(&mut self) -> CompileResult<()> {
        self.expect_keyword(&["if"])?;
        self.expect_symbol("(")?;
        self.compile_expression()?;

        let index = self.claim_label_index();
        let else_label = format!("IF_START_{}", index);
        let end_label = format!("IF_END_{}", index);

        self.writer.command(VmCommand::Not);
        self.writer.if_goto(&else_label);

        self.expect_symbol(")")?;
        self.expect_symbol("{")?;
        self.compile_statements()?;
        self.expect_symbol("}")?;

        self.writer.goto(&end_label);
        self.writer.label(&else_label);

        if let Kind::Keyword("else") = self.token.kind {
            self.advance();
            self.expect_symbol("{")?;
            self.compile_statements()?;
            self.expect_symbol("}")?;
        }

        self.writer.label(&end_label);
        Ok(())
    }

    fn compile_while(&mut self) -> CompileResult<()> {
        let index = self.claim_label_index();
        let start_label = format!("WHILE_START_{}", index);
        let end_label = format!("WHILE_END_{}", index);

        self.expect_keyword(&["while"])?;
        self.expect_symbol("(")?;
        self.writer.label(&start_label);
        self.compile_expression()?;
        self.expect_symbol(")")?;

        self.writer.command(VmCommand::Not);
        self.writer.if_goto(&end_label);

        self.expect_symbol("{")?;
        self.compile_statements()?;
        self.expect_symbol("}")?;

        self.writer.goto(&start_label);
        self.writer.label(&end_label);
        Ok(())
    }

    fn compile_do(&mut self) -> CompileResult<()> {
        self.expect_keyword(&["do"])?;

        let id = self.expect_ident()?;
        if !matches!(self.token.kind, Kind::Symbol("(" | ".")) {
            return Err(self.unexpected("`(' or `.'"));
        }
        self.compile_call(id)?;

        // The called subroutine's return value is unused
        self.writer.pop(Segment::Temp, 0);

        self.expect_symbol(";")?;
        Ok(())
    }

    fn compile_return(&mut self) -> CompileResult<()> {
        self.expect_keyword(&["return"])?;

        if let Kind::Symbol(";") = self.token.kind {
            // Void returns still leave one value for the caller to discard
            self.writer.push(Segment::Constant, 0);
        } else {
            self.compile_expression()?;
        }

        self.expect_symbol(";")?;
        self.writer.command(VmCommand::Return);
        Ok(())
    }

    fn compile_expression(&mut self) -> CompileResult<()> {
        self.compile_term()?;

        loop {
            let op = match self.token.kind {
                Kind::Symbol(op @ ("+" | "-" | "*" | "/" | "&" | "|" | "<" | ">" | "=")) => op,
                _ => return Ok(()),
            };
            self.advance();
            self.compile_term()?;

            match op {
                "+" => self.writer.command(VmCommand::Add),
                "-" => self.writer.command(VmCommand::Sub),
                "&" => self.writer.command(VmCommand::And),
                "|" => self.writer.command(VmCommand::Or),
                "<" => self.writer.command(VmCommand::Lt),
                ">" => self.writer.command(VmCommand::Gt),
                "=" => self.writer.command(VmCommand::Eq),
                "*" => self.writer.call("Math.multiply", 2),
                "/" => self.writer.call("Math.divide", 2),
                _ => unreachable!(),
            }
        }
    }

    fn compile_term(&mut self) -> CompileResult<()> {
        match self.token.kind {
            Kind::IntConst(literal) => {
                let value = literal
                    .parse::<u32>()
                    .ok()
                    .filter(|&n| n <= 32767)
                    .ok_or_else(|| {
                        SpanError::new(
                            format!("integer constant `{}' out of range", literal),
                            self.token.span,
                        )
                    })?;
                self.writer.push(Segment::Constant, value as u16);
                self.advance();
            }
            Kind::StrConst(literal) => {
                let units = literal.encode_utf16().collect::<Vec<u16>>();
                self.writer.push(Segment::Constant, units.len() as u16);
                self.writer.call("String.new", 1);
                for unit in units {
                    self.writer.push(Segment::Constant, unit);
                    self.writer.call("String.appendChar", 2);
                }
                self.advance();
            }
            Kind::Keyword("true") => {
                self.writer.push(Segment::Constant, 1);
                self.writer.command(VmCommand::Neg);
                self.advance();
            }
            Kind::Keyword("false" | "null") => {
                self.writer.push(Segment::Constant, 0);
                self.advance();
            }
            Kind::Keyword("this") => {
                self.writer.push(Segment::Pointer, 0);
                self.advance();
            }
            Kind::Symbol("-") => {
                self.advance();
                self.compile_term()?;
                self.writer.command(VmCommand::Neg);
            }
            Kind::Symbol("~") => {
                self.advance();
                self.compile_term()?;
                self.writer.command(VmCommand::Not);
            }
            Kind::Symbol("(") => {
                self.advance();
                self.compile_expression()?;
                self.expect_symbol(")")?;
            }
            Kind::Ident(_) => {
                let id = self.expect_ident()?;
                match self.token.kind {
                    Kind::Symbol("[") => {
                        let entry = self.lookup(&id)?;
                        self.advance();
                        self.writer.push(entry.kind.segment(), entry.index);
                        self.compile_expression()?;
                        self.expect_symbol("]")?;
                        self.writer.command(VmCommand::Add);
                        self.writer.pop(Segment::Pointer, 1);
                        self.writer.push(Segment::That, 0);
                    }
                    Kind::Symbol("(" | ".") => self.compile_call(id)?,
                    _ => {
                        let entry = self.lookup(&id)?;
                        self.writer.push(entry.kind.segment(), entry.index);
                    }
                }
            }
            _ => return Err(self.unexpected("a term")),
        }
        Ok(())
    }

    /// Compiles a subroutine call whose leading identifier has already been
    /// consumed; the current token is `(` or `.`. A receiver variable makes
    /// it a method call on that object, a bare name followed by `.` names a
    /// class, and a bare name followed by `(` is a method call on the
    /// current object.
    fn compile_call(&mut self, id: Token<'a>) -> CompileResult<()> {
        let (callee, arg_base) = match self.resolve(id.kind.literal()) {
            Some(receiver) => {
                self.writer.push(receiver.kind.segment(), receiver.index);
                (receiver.ty, 1)
            }
            None if matches!(self.token.kind, Kind::Symbol(".")) => (id.kind.literal(), 0),
            None => {
                self.writer.push(Segment::Pointer, 0);
                (self.class_name, 1)
            }
        };

        let subroutine = if let Kind::Symbol(".") = self.token.kind {
            self.advance();
            self.expect_ident()?.kind.literal()
        } else {
            id.kind.literal()
        };

        self.expect_symbol("(")?;
        let n_args = self.compile_expression_list()?;
        self.expect_symbol(")")?;

        self.writer
            .call(&format!("{}.{}", callee, subroutine), arg_base + n_args);
        Ok(())
    }

    fn compile_expression_list(&mut self) -> CompileResult<u16> {
        if let Kind::Symbol(")") = self.token.kind {
            return Ok(0);
        }

        self.compile_expression()?;
        let mut count = 1;
        while let Kind::Symbol(",") = self.token.kind {
            self.advance();
            self.compile_expression()?;
            count += 1;
        }
        Ok(count)
    }

    /// Claims the next control-structure index; the label pair of one `if`
    /// or `while` shares it. The first claim yields 1.
    fn claim_label_index(&mut self) -> usize {
        self.labels_claimed += 1;
        self.labels_claimed
    }

    fn resolve(&self, name: &str) -> Option<SymbolTableEntry<'a>> {
        self.sub_table
            .get(name)
            .or_else(|| self.class_table.get(name))
            .copied()
    }

    fn lookup(&self, token: &Token<'a>) -> CompileResult<SymbolTableEntry<'a>> {
        self.resolve(token.kind.literal()).ok_or_else(|| {
            SpanError::new(
                format!(
                    "variable `{}' not declared in {}.{}",
                    token.kind.literal(),
                    self.class_name,
                    self.subroutine_name
                ),
                token.span,
            )
        })
    }

    fn advance(&mut self) -> Token<'a> {
        self.token = self.tokenizer.next_token();
        self.token
    }

    fn expect_symbol(&mut self, symbol: &str) -> CompileResult<Token<'a>> {
        match self.token.kind {
            Kind::Symbol(literal) if literal == symbol => {
                let token = self.token;
                self.advance();
                Ok(token)
            }
            _ => Err(self.unexpected(&format!("`{}'", symbol))),
        }
    }

    fn expect_keyword(&mut self, allowed: &[&str]) -> CompileResult<Token<'a>> {
        match self.token.kind {
            Kind::Keyword(literal) if allowed.contains(&literal) => {
                let token = self.token;
                self.advance();
                Ok(token)
            }
            _ => {
                let expected = match allowed {
                    [single] => format!("`{}'", single),
                    _ => format!("one of {:?}", allowed),
                };
                Err(self.unexpected(&expected))
            }
        }
    }

    fn expect_ident(&mut self) -> CompileResult<Token<'a>> {
        match self.token.kind {
            Kind::Ident(_) => {
                let token = self.token;
                self.advance();
                Ok(token)
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    fn expect_type(&mut self) -> CompileResult<Token<'a>> {
        match self.token.kind {
            Kind::Keyword("int" | "char" | "boolean") | Kind::Ident(_) => {
                let token = self.token;
                self.advance();
                Ok(token)
            }
            _ => Err(self.unexpected("a type")),
        }
    }

    fn unexpected(&self, expected: &str) -> SpanError {
        let msg = match self.token.kind {
            Kind::Invalid(literal) if literal.starts_with("/*") => {
                "unterminated block comment".to_string()
            }
            Kind::Invalid(literal) if literal.starts_with('"') => {
                "unterminated string constant".to_string()
            }
            Kind::Invalid(literal) => format!("invalid character `{}'", literal),
            kind => format!("unexpected token `{}', expected {}", kind, expected),
        };
        SpanError::new(msg, self.token.span)
    }
}
