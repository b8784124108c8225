//! Bytecode emitter (§4.4, §6): turns a checked AST into the four-part
//! bytecode image a stack-machine VM would load.

pub mod emitter;
pub mod error;
pub mod op;
pub mod pool;

pub use emitter::{generate, BytecodeImage};
pub use error::{GenError, GenResult};
pub use op::{Op, OpCode};
pub use pool::{BytecodePool, MAX_CELLS};
