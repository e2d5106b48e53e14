//! `pyrpc call`: run one function through the RPC handler
//!
//! The call takes the same path a remote request does: the target and its
//! arguments are serialized, executed, and the serialized result is loaded
//! back before it is printed.

use crate::errors::CliError;
use crate::GlobalOpts;
use clap::Args;
use pyo3::prelude::*;
use pyo3::types::{PyList, PyModule, PyTuple};
use pyrpc_config::Config;
use pyrpc_logger as logger;
use pyrpc_python::errors::format_python_error;
use pyrpc_python::{BridgeError, PythonRpcHandler, RpcRuntime};
use serde_json::Value;

#[derive(Args, Debug, Clone)]
pub struct CallCommand {
    /// Function to call, as module:function (e.g. operator:add)
    pub target: String,

    /// Positional arguments as a JSON array
    #[arg(default_value = "[]")]
    pub args: String,

    /// Keyword arguments as a JSON object
    #[arg(long, default_value = "{}")]
    pub kwargs: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct CallTarget {
    pub module: String,
    pub function: String,
}

pub fn parse_target(target: &str) -> Result<CallTarget, CliError> {
    let invalid = || CliError::InvalidTarget(target.to_string());
    let (module, function) = target.split_once(':').ok_or_else(invalid)?;
    let module = module.trim();
    let function = function.trim();

    if module.split('.').any(str::is_empty) || function.is_empty() || function.contains(':') {
        return Err(invalid());
    }
    Ok(CallTarget {
        module: module.to_string(),
        function: function.to_string(),
    })
}

/// Validate the JSON arguments, returning them re-encoded compactly
pub fn parse_arguments(args: &str, kwargs: &str) -> Result<(String, String), CliError> {
    let args: Value = serde_json::from_str(args).map_err(|e| CliError::InvalidArguments {
        what: "arguments",
        reason: e.to_string(),
    })?;
    if !args.is_array() {
        return Err(CliError::InvalidArguments {
            what: "arguments",
            reason: "expected a JSON array".to_string(),
        });
    }

    let kwargs: Value = serde_json::from_str(kwargs).map_err(|e| CliError::InvalidArguments {
        what: "keyword arguments",
        reason: e.to_string(),
    })?;
    if !kwargs.is_object() {
        return Err(CliError::InvalidArguments {
            what: "keyword arguments",
            reason: "expected a JSON object".to_string(),
        });
    }
    Ok((args.to_string(), kwargs.to_string()))
}

pub fn handle_call(cmd: CallCommand, _opts: &GlobalOpts) -> Result<(), CliError> {
    let target = parse_target(&cmd.target)?;
    let (args, kwargs) = parse_arguments(&cmd.args, &cmd.kwargs)?;

    let runtime = RpcRuntime::install_global(Config::load()?)?;
    let outcome = runtime
        .handler()
        .map_err(CliError::from)
        .and_then(|handler| invoke(handler, &target, &args, &kwargs));
    runtime.shutdown()?;

    println!("{}", outcome?);
    Ok(())
}

/// Run the call and return `repr()` of its result
fn invoke(
    handler: &PythonRpcHandler,
    target: &CallTarget,
    args: &str,
    kwargs: &str,
) -> Result<String, CliError> {
    let call = Python::attach(|py| build_call(py, target, args, kwargs)).map_err(|e| {
        CliError::CallFailed(Python::attach(|py| format_python_error(py, &e)))
    })?;

    let request = handler.serialize(&call)?;
    logger::debug(&format!(
        "Request for {}:{}: {} bytes, {} tensors",
        target.module,
        target.function,
        request.payload().len(),
        request.tensors().len()
    ));

    let response = match handler.execute(request.payload(), request.tensors()) {
        Ok(response) => response,
        Err(error) => return Err(route_failure(handler, error)),
    };
    logger::debug(&format!(
        "Response: {} bytes, {} tensors",
        response.payload().len(),
        response.tensors().len()
    ));

    let value = handler.load_value(response.payload(), response.tensors())?;
    let rendered = Python::attach(|py| -> PyResult<String> {
        Ok(value.bind(py).repr()?.to_string())
    })
    .map_err(BridgeError::from)?;
    Ok(rendered)
}

fn build_call(py: Python<'_>, target: &CallTarget, args: &str, kwargs: &str) -> PyResult<Py<PyAny>> {
    let function = PyModule::import(py, target.module.as_str())?.getattr(target.function.as_str())?;
    let json = PyModule::import(py, "json")?;
    let args = json
        .call_method1("loads", (args,))?
        .cast_into::<PyList>()?
        .to_tuple();
    let kwargs = json.call_method1("loads", (kwargs,))?;
    Ok(PyTuple::new(py, [function, args.into_any(), kwargs])?
        .into_any()
        .unbind())
}

/// Hand a failed call to the internal module's exception handler and report it
fn route_failure(handler: &PythonRpcHandler, error: BridgeError) -> CliError {
    let message = match &error {
        BridgeError::Python(err) => Python::attach(|py| format_python_error(py, err)),
        other => other.to_string(),
    };
    if let Err(e) = handler.handle_error(error) {
        logger::warn(&format!("Exception handler re-raised: {}", e));
    }
    CliError::CallFailed(message)
}
