//! The single gateway between native RPC workers and the interpreter
//!
//! `PythonRpcHandler` resolves four entry points from the internal module
//! once, then runs every operation through them with the interpreter lock
//! held for the whole call. After `cleanup` the entry points are gone and
//! every operation fails with `BridgeError::ShutDown`.

use crate::errors::{format_python_error, BridgeError};
use crate::initialization::prepare_interpreter;
use crate::interpreter_lock::with_interpreter;
use crate::runtime::RpcRuntime;
use crate::serialized::{wire_args, SerializedPyObj};
use crate::tensor::TensorHandle;
use parking_lot::RwLock;
use pyo3::prelude::*;
use pyo3::types::PyModule;
use pyrpc_config::Config;
use pyrpc_logger as logger;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub const RUN_FUNCTION: &str = "_run_function";
pub const LOAD_RETURN_VALUE: &str = "_load_return_value";
pub const SERIALIZE: &str = "serialize";
pub const HANDLE_EXCEPTION: &str = "_handle_exception";

/// Set by the first `cleanup`. No handler is built in this process afterwards.
static TORN_DOWN: AtomicBool = AtomicBool::new(false);

/// Entry points resolved from the internal module. Always all present.
struct EntryPoints {
    run_function: Py<PyAny>,
    load_return_value: Py<PyAny>,
    serialize: Py<PyAny>,
    handle_exception: Py<PyAny>,
}

impl EntryPoints {
    fn resolve(module: &Bound<'_, PyModule>) -> Result<Self, BridgeError> {
        Ok(Self {
            run_function: get_function(module, RUN_FUNCTION)?,
            load_return_value: get_function(module, LOAD_RETURN_VALUE)?,
            serialize: get_function(module, SERIALIZE)?,
            handle_exception: get_function(module, HANDLE_EXCEPTION)?,
        })
    }

    fn named(&self) -> [(&'static str, &Py<PyAny>); 4] {
        [
            (RUN_FUNCTION, &self.run_function),
            (LOAD_RETURN_VALUE, &self.load_return_value),
            (SERIALIZE, &self.serialize),
            (HANDLE_EXCEPTION, &self.handle_exception),
        ]
    }
}

fn get_function(module: &Bound<'_, PyModule>, name: &str) -> Result<Py<PyAny>, BridgeError> {
    let attr = module.getattr(name).map_err(|e| BridgeError::EntryPoint {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    if !attr.is_callable() {
        let type_name = attr
            .get_type()
            .name()
            .map(|n| n.to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());
        return Err(BridgeError::EntryPoint {
            name: name.to_string(),
            reason: format!("attribute is not callable (found {})", type_name),
        });
    }
    Ok(attr.unbind())
}

pub struct PythonRpcHandler {
    module_path: String,
    slow_lock_warn: Duration,
    entry_points: RwLock<Option<EntryPoints>>,
}

impl PythonRpcHandler {
    /// The process-wide handler, constructed on first use.
    ///
    /// A construction failure is cached and returned to every later caller;
    /// it is never retried.
    pub fn get_instance() -> Result<&'static PythonRpcHandler, BridgeError> {
        RpcRuntime::global()?.handler()
    }

    pub(crate) fn new(config: &Config) -> Result<Self, BridgeError> {
        if TORN_DOWN.load(Ordering::Acquire) {
            return Err(BridgeError::ShutDown);
        }
        let start_time = Instant::now();

        let init_start = Instant::now();
        pyo3::Python::initialize();
        logger::debug(&format!(
            "pyo3::Python::initialize took: {:?}",
            init_start.elapsed()
        ));

        let module_path = config.module_path.clone();
        let entry_points = with_interpreter("initialize", config.slow_lock_warn(), |py| {
            prepare_interpreter(py, config)?;
            let module = PyModule::import(py, module_path.as_str()).map_err(|e| {
                BridgeError::Import(module_path.clone(), format_python_error(py, &e))
            })?;
            EntryPoints::resolve(&module)
        })?;

        logger::debug(&format!(
            "Resolved RPC entry points from {} in {:?}",
            module_path,
            start_time.elapsed()
        ));

        Ok(Self {
            module_path,
            slow_lock_warn: config.slow_lock_warn(),
            entry_points: RwLock::new(Some(entry_points)),
        })
    }

    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    /// False once `cleanup` has run
    pub fn is_active(&self) -> bool {
        self.entry_points.read().is_some()
    }

    /// Drop the four entry points. Terminal for the process: no handler can
    /// be built afterwards.
    ///
    /// Must run before the interpreter itself is finalized. Calling it again
    /// is harmless.
    pub fn cleanup(&self) -> Result<(), BridgeError> {
        with_interpreter("cleanup", self.slow_lock_warn, |_py| {
            TORN_DOWN.store(true, Ordering::Release);
            // Dropped here, with the GIL held, so the references are released now
            let cleared = self.entry_points.write().take();
            if cleared.is_some() {
                logger::debug(&format!("Released RPC entry points of {}", self.module_path));
            }
            Ok(())
        })
    }

    fn with_entry_points<R>(
        &self,
        op: &str,
        f: impl FnOnce(Python<'_>, &EntryPoints) -> Result<R, BridgeError>,
    ) -> Result<R, BridgeError> {
        with_interpreter(op, self.slow_lock_warn, |py| {
            let guard = self.entry_points.read();
            let entry_points = guard.as_ref().ok_or(BridgeError::ShutDown)?;
            f(py, entry_points)
        })
    }

    /// Run a pickled call and serialize whatever it returns.
    ///
    /// Decoding, running and encoding happen in one hold of the interpreter
    /// lock. Exceptions raised by the called function come back as
    /// `BridgeError::Python`.
    pub fn execute(
        &self,
        payload: &[u8],
        tensors: &[TensorHandle],
    ) -> Result<SerializedPyObj, BridgeError> {
        self.with_entry_points("execute", |py, eps| {
            let (data, table) = wire_args(py, payload, tensors)?;
            let result = eps.run_function.bind(py).call1((data, table))?;
            let wire = eps.serialize.bind(py).call1((result,))?;
            SerializedPyObj::from_wire(&wire)
        })
    }

    /// Run a pickled call and hand back the live result without serializing it
    pub fn run_udf(&self, call: &SerializedPyObj) -> Result<Py<PyAny>, BridgeError> {
        self.with_entry_points("run_udf", |py, eps| {
            let (data, table) = call.to_call_args(py)?;
            Ok(eps.run_function.bind(py).call1((data, table))?.unbind())
        })
    }

    /// Rebuild a return value produced by `execute` or `serialize`
    pub fn load_value(
        &self,
        payload: &[u8],
        tensors: &[TensorHandle],
    ) -> Result<Py<PyAny>, BridgeError> {
        self.with_entry_points("load_value", |py, eps| {
            let (data, table) = wire_args(py, payload, tensors)?;
            Ok(eps.load_return_value.bind(py).call1((data, table))?.unbind())
        })
    }

    pub fn serialize(&self, obj: &Py<PyAny>) -> Result<SerializedPyObj, BridgeError> {
        self.with_entry_points("serialize", |py, eps| {
            let wire = eps.serialize.bind(py).call1((obj.bind(py),))?;
            SerializedPyObj::from_wire(&wire)
        })
    }

    pub fn deserialize(&self, obj: &SerializedPyObj) -> Result<Py<PyAny>, BridgeError> {
        self.with_entry_points("deserialize", |py, eps| {
            let (data, table) = obj.to_call_args(py)?;
            Ok(eps.load_return_value.bind(py).call1((data, table))?.unbind())
        })
    }

    /// Pass an exception object to the `_handle_exception` entry point.
    ///
    /// If the handler re-raises, the raised exception is returned as
    /// `BridgeError::Python`.
    pub fn handle_exception(&self, exception: &Py<PyAny>) -> Result<(), BridgeError> {
        self.with_entry_points("handle_exception", |py, eps| {
            eps.handle_exception.bind(py).call1((exception.bind(py),))?;
            Ok(())
        })
    }

    /// Route a failed operation's exception through `handle_exception`.
    ///
    /// Errors that did not come from the interpreter carry no exception
    /// object and are returned unchanged.
    pub fn handle_error(&self, error: BridgeError) -> Result<(), BridgeError> {
        let Some(exception) = Python::attach(|py| error.exception_object(py)) else {
            return Err(error);
        };
        self.handle_exception(&exception)
    }

    /// `repr()` of each resolved entry point, for diagnostics
    pub fn describe_entry_points(&self) -> Result<Vec<(&'static str, String)>, BridgeError> {
        self.with_entry_points("describe_entry_points", |py, eps| {
            eps.named()
                .into_iter()
                .map(|(name, func)| -> Result<(&'static str, String), BridgeError> {
                    Ok((name, func.bind(py).repr()?.to_string()))
                })
                .collect()
        })
    }
}
