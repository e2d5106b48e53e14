//! Opaque tensor handles passed through the bridge
//!
//! A handle is a counted reference to a tensor object living in the
//! interpreter. The bridge never looks inside it, copies its storage, or
//! frees it; dropping a handle only releases the reference.

use crate::errors::BridgeError;
use pyo3::prelude::*;
use pyo3::types::PyList;

#[derive(Debug)]
pub struct TensorHandle(Py<PyAny>);

impl TensorHandle {
    pub fn new(obj: Py<PyAny>) -> Self {
        TensorHandle(obj)
    }

    pub fn from_bound(obj: &Bound<'_, PyAny>) -> Self {
        TensorHandle(obj.clone().unbind())
    }

    pub fn bind<'py>(&self, py: Python<'py>) -> &Bound<'py, PyAny> {
        self.0.bind(py)
    }

    pub fn as_py(&self) -> &Py<PyAny> {
        &self.0
    }

    pub fn into_inner(self) -> Py<PyAny> {
        self.0
    }

    pub fn clone_ref(&self, py: Python<'_>) -> Self {
        TensorHandle(self.0.clone_ref(py))
    }

    /// True when both handles point at the same interpreter object
    pub fn is(&self, other: &TensorHandle) -> bool {
        self.0.as_ptr() == other.0.as_ptr()
    }
}

impl Clone for TensorHandle {
    fn clone(&self) -> Self {
        Python::attach(|py| self.clone_ref(py))
    }
}

/// Build the interpreter-side tensor table passed to the entry points
pub(crate) fn to_py_list<'py>(
    py: Python<'py>,
    tensors: &[TensorHandle],
) -> PyResult<Bound<'py, PyList>> {
    PyList::new(py, tensors.iter().map(|t| t.bind(py)))
}

/// Collect a tensor table returned by the interpreter
pub(crate) fn from_py_sequence(seq: &Bound<'_, PyAny>) -> Result<Vec<TensorHandle>, BridgeError> {
    let iter = seq.try_iter().map_err(|e| {
        BridgeError::Serialization(format!("tensor table is not iterable: {}", e))
    })?;
    iter.map(|item| -> Result<TensorHandle, BridgeError> {
        Ok(TensorHandle::from_bound(&item?))
    })
    .collect()
}
