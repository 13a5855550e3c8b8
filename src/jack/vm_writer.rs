/// A memory segment of the Hack VM.
#[derive(Debug, PartialEq, Eq, Clone, Copy, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

/// A zero-operand VM instruction: the arithmetic/logic commands plus
/// `return`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum VmCommand {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
    Return,
}

/// Accumulates VM instructions, one per `\n`-terminated line, in the order
/// they are emitted. The finished buffer is the compiled `.vm` file body;
/// there is no header or footer.
pub struct VmWriter {
    buf: String,
}

impl VmWriter {
    pub fn new() -> VmWriter {
        VmWriter { buf: String::new() }
    }

    pub fn push(&mut self, segment: Segment, index: u16) {
        self.emit(format!("push {} {}", segment, index));
    }

    pub fn pop(&mut self, segment: Segment, index: u16) {
        self.emit(format!("pop {} {}", segment, index));
    }

    pub fn command(&mut self, command: VmCommand) {
        self.emit(command.to_string());
    }

    pub fn label(&mut self, label: &str) {
        self.emit(format!("label {}", label));
    }

    pub fn goto(&mut self, label: &str) {
        self.emit(format!("goto {}", label));
    }

    pub fn if_goto(&mut self, label: &str) {
        self.emit(format!("if-goto {}", label));
    }

    pub fn call(&mut self, name: &str, n_args: u16) {
        self.emit(format!("call {} {}", name, n_args));
    }

    pub fn function(&mut self, name: &str, n_vars: u16) {
        self.emit(format!("function {} {}", name, n_vars));
    }

    pub fn into_code(self) -> String {
        self.buf
    }

    fn emit<T: AsRef<str>>(&mut self, line: T) {
        self.buf.push_str(line.as_ref());
        self.buf.push('\n');
    }
}
