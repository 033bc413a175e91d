pub mod compile;
pub mod compile_error;
pub mod emitter;
pub mod ir;
pub mod op;

pub use compile::{compile_reader, compile_source, Compiler};
pub use compile_error::CompileError;
pub use emitter::Emitter;
pub use ir::VmModule;
pub use op::{ArithmeticOp, Command, Segment};
