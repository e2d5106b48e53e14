//! Shared helpers for the bridge integration tests

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyModule};
use pyrpc_config::Config;
use pyrpc_python::{BridgeError, PythonRpcHandler, RpcRuntime, SerializedPyObj};
use std::ffi::CString;
use std::thread::ScopedJoinHandle;

pub fn fixtures_dir() -> String {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures").to_string()
}

/// Config pointing at `module_path` with the fixtures importable
pub fn test_config(module_path: &str) -> Config {
    Config {
        module_path: module_path.to_string(),
        python_paths: vec![fixtures_dir()],
        ..Config::default()
    }
}

/// The process-wide handler, backed by the bundled internal module
pub fn global_handler() -> Result<&'static PythonRpcHandler, BridgeError> {
    // Whichever test gets here first installs the config; the rest reuse it
    let _ = RpcRuntime::install_global(test_config(pyrpc_python::BUILTIN_MODULE_NAME));
    PythonRpcHandler::get_instance()
}

/// Evaluate a Python expression with `operator` and `rpc_fixtures` in scope
pub fn eval(py: Python<'_>, expr: &str) -> PyResult<Py<PyAny>> {
    let globals = PyDict::new(py);
    globals.set_item("operator", PyModule::import(py, "operator")?)?;
    globals.set_item("rpc_fixtures", PyModule::import(py, "rpc_fixtures")?)?;
    let code = CString::new(expr)
        .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))?;
    Ok(py.eval(&code, Some(&globals), None)?.unbind())
}

/// Serialize `(func, args, {})` into a call payload through the handler
pub fn encode_call(
    handler: &PythonRpcHandler,
    func: &str,
    args: &str,
) -> Result<SerializedPyObj, BridgeError> {
    let call = Python::attach(|py| eval(py, &format!("({}, {}, {{}})", func, args)))?;
    handler.serialize(&call)
}

/// Attribute of the `rpc_fixtures` module
pub fn fixture<'py>(py: Python<'py>, name: &str) -> PyResult<Bound<'py, PyAny>> {
    PyModule::import(py, "rpc_fixtures")?.getattr(name)
}

/// Join scoped threads, re-raising any panic on the calling thread
pub fn join_all<T>(handles: Vec<ScopedJoinHandle<'_, T>>) -> Vec<T> {
    handles
        .into_iter()
        .map(|h| match h.join() {
            Ok(value) => value,
            Err(panic) => std::panic::resume_unwind(panic),
        })
        .collect()
}

pub fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
