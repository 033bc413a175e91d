use crate::bytecode::op::{ArithmeticOp, Command, Segment};

/// Sink for generated bytecode.
///
/// Implementors only provide `emit`; the rest are shorthands the compiler
/// uses so call sites read like the text they produce.
pub trait Emitter {
    fn emit(&mut self, command: Command);

    fn push(&mut self, segment: Segment, index: u16) {
        self.emit(Command::Push(segment, index));
    }

    fn pop(&mut self, segment: Segment, index: u16) {
        self.emit(Command::Pop(segment, index));
    }

    fn arithmetic(&mut self, op: ArithmeticOp) {
        self.emit(Command::Arithmetic(op));
    }

    fn label(&mut self, label: &str) {
        self.emit(Command::Label(label.to_string()));
    }

    fn goto(&mut self, label: &str) {
        self.emit(Command::Goto(label.to_string()));
    }

    fn if_goto(&mut self, label: &str) {
        self.emit(Command::IfGoto(label.to_string()));
    }

    fn call(&mut self, name: &str, n_args: u16) {
        self.emit(Command::Call {
            name: name.to_string(),
            n_args,
        });
    }

    fn function(&mut self, name: &str, n_locals: u16) {
        self.emit(Command::Function {
            name: name.to_string(),
            n_locals,
        });
    }

    fn ret(&mut self) {
        self.emit(Command::Return);
    }
}

impl Emitter for Vec<Command> {
    fn emit(&mut self, command: Command) {
        Vec::push(self, command);
    }
}
