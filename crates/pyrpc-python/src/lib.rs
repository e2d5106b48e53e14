//! Bridge between native RPC workers and the embedded Python interpreter
//!
//! Remote calls arrive as pickled payloads plus a table of tensors that
//! travel out-of-band. This crate is the only code path that hands them to
//! the interpreter:
//! 1. `PythonRpcHandler` resolves the internal module's four entry points
//!    once and exposes execute / load / serialize / deserialize / exception
//!    handling on top of them
//! 2. every operation holds the process-wide interpreter lock for its whole
//!    duration, so calls from any number of worker threads run one at a time
//! 3. `RpcRuntime` owns construction and the terminal teardown

pub mod errors;
mod handler;
mod initialization;
pub mod interpreter_lock;
mod runtime;
mod serialized;
mod tensor;

pub use errors::BridgeError;
pub use handler::{
    PythonRpcHandler, HANDLE_EXCEPTION, LOAD_RETURN_VALUE, RUN_FUNCTION, SERIALIZE,
};
pub use initialization::BUILTIN_MODULE_NAME;
pub use interpreter_lock::LockStats;
pub use runtime::RpcRuntime;
pub use serialized::SerializedPyObj;
pub use tensor::TensorHandle;
