//! Serialized interpreter objects with out-of-band tensors

use crate::errors::BridgeError;
use crate::tensor::{self, TensorHandle};
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyList, PyTuple};

/// A pickled object split into its byte payload and its tensor table.
///
/// Tensors referenced by the payload are encoded as position-indexed
/// placeholders into `tensors`; their bytes never appear in `payload`.
#[derive(Debug, Clone)]
pub struct SerializedPyObj {
    payload: Vec<u8>,
    tensors: Vec<TensorHandle>,
}

impl SerializedPyObj {
    pub fn new(payload: Vec<u8>, tensors: Vec<TensorHandle>) -> Self {
        Self { payload, tensors }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn tensors(&self) -> &[TensorHandle] {
        &self.tensors
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<TensorHandle>) {
        (self.payload, self.tensors)
    }

    /// Split the `(bytes, tensors)` pair returned by the `serialize` entry point
    pub fn from_wire(result: &Bound<'_, PyAny>) -> Result<Self, BridgeError> {
        let pair = result.cast::<PyTuple>().map_err(|e| {
            BridgeError::Serialization(format!("serialize must return a tuple: {}", e))
        })?;
        if pair.len() != 2 {
            return Err(BridgeError::Serialization(format!(
                "serialize must return (payload, tensors), got {} elements",
                pair.len()
            )));
        }

        let payload = pair.get_item(0)?;
        let payload = payload.cast::<PyBytes>().map_err(|e| {
            BridgeError::Serialization(format!("payload must be bytes: {}", e))
        })?;
        let tensors = tensor::from_py_sequence(&pair.get_item(1)?)?;

        Ok(Self::new(payload.as_bytes().to_vec(), tensors))
    }

    /// Arguments in the shape `_run_function` and `_load_return_value` expect
    pub(crate) fn to_call_args<'py>(
        &self,
        py: Python<'py>,
    ) -> PyResult<(Bound<'py, PyBytes>, Bound<'py, PyList>)> {
        wire_args(py, &self.payload, &self.tensors)
    }
}

pub(crate) fn wire_args<'py>(
    py: Python<'py>,
    payload: &[u8],
    tensors: &[TensorHandle],
) -> PyResult<(Bound<'py, PyBytes>, Bound<'py, PyList>)> {
    Ok((PyBytes::new(py, payload), tensor::to_py_list(py, tensors)?))
}
