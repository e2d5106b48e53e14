use pyo3::prelude::*;
use std::io;
use thiserror::Error;

/// Errors surfaced by the interpreter bridge
///
/// Nothing is recovered inside the bridge. Interpreter exceptions keep the
/// original `PyErr` so the caller can hand the exception object to
/// `PythonRpcHandler::handle_exception` and ship it back over RPC.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Python error: {0}")]
    Python(#[from] PyErr),

    #[error("Failed to import module '{0}': {1}")]
    Import(String, String),

    #[error("RPC entry point '{name}' is unusable: {reason}")]
    EntryPoint { name: String, reason: String },

    #[error("Failed to initialize Python bridge: {0}")]
    Initialization(String),

    #[error("Python bridge used after cleanup")]
    ShutDown,

    #[error("Python bridge re-entered from inside a bridge call on the same thread")]
    Reentrant,

    #[error("Failed to serialize/deserialize data: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl BridgeError {
    /// The interpreter exception object, if this error came from Python
    pub fn exception_object(&self, py: Python<'_>) -> Option<Py<PyAny>> {
        match self {
            BridgeError::Python(err) => Some(err.value(py).clone().into_any().unbind()),
            _ => None,
        }
    }

    /// Rebuild a cached initialization failure.
    ///
    /// `PyErr` and `io::Error` are not `Clone`, so those degrade to their
    /// rendered message.
    pub(crate) fn replay(&self) -> BridgeError {
        match self {
            BridgeError::Import(module, msg) => BridgeError::Import(module.clone(), msg.clone()),
            BridgeError::EntryPoint { name, reason } => BridgeError::EntryPoint {
                name: name.clone(),
                reason: reason.clone(),
            },
            BridgeError::ShutDown => BridgeError::ShutDown,
            BridgeError::Reentrant => BridgeError::Reentrant,
            BridgeError::Initialization(msg) => BridgeError::Initialization(msg.clone()),
            other => BridgeError::Initialization(other.to_string()),
        }
    }
}

/// Render a `PyErr` with its traceback, when one is attached
pub fn format_python_error(py: Python<'_>, err: &PyErr) -> String {
    let msg = format!("{err}");
    if let Some(tb) = err.traceback(py) {
        if let Ok(formatted) = tb.format() {
            return format!("{formatted}{msg}");
        }
    }
    msg
}
