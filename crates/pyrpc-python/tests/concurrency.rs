//! Calls from many worker threads never run inside the interpreter at once

mod common;

use common::{encode_call, fixture, global_handler, join_all};
use pyo3::prelude::*;
use pyrpc_python::{interpreter_lock, BridgeError};
use std::thread;

const WORKERS: i64 = 8;
const DELAY_SECS: f64 = 0.02;

fn record_call(tag: i64) -> Result<i64, BridgeError> {
    let handler = global_handler()?;
    let request = encode_call(
        handler,
        "rpc_fixtures.record_call",
        &format!("({}, {})", tag, DELAY_SECS),
    )?;
    let response = handler.execute(request.payload(), request.tensors())?;
    let value = handler.load_value(response.payload(), response.tensors())?;
    Ok(Python::attach(|py| value.bind(py).extract())?)
}

/// `(start, end)` intervals recorded by `record_call` for tags in `range`
fn recorded_intervals(range: std::ops::Range<i64>) -> PyResult<Vec<(f64, f64)>> {
    Python::attach(|py| {
        let calls: Vec<(i64, f64, f64)> = fixture(py, "CALLS")?.extract()?;
        let mut intervals: Vec<(f64, f64)> = calls
            .into_iter()
            .filter(|(tag, _, _)| range.contains(tag))
            .map(|(_, start, end)| (start, end))
            .collect();
        intervals.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(intervals)
    })
}

fn assert_serialized(intervals: &[(f64, f64)]) {
    for pair in intervals.windows(2) {
        assert!(
            pair[0].1 <= pair[1].0,
            "calls overlapped: {:?} and {:?}",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn test_parallel_execute_runs_one_call_at_a_time() -> Result<(), BridgeError> {
    global_handler()?;
    let results = thread::scope(|s| {
        let handles = (0..WORKERS)
            .map(|tag| s.spawn(move || record_call(tag)))
            .collect();
        join_all(handles)
    });

    let mut tags = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    tags.sort_unstable();
    assert_eq!(tags, (0..WORKERS).collect::<Vec<_>>());

    let intervals = recorded_intervals(0..100)?;
    assert_eq!(intervals.len(), WORKERS as usize);
    assert_serialized(&intervals);
    assert!(!interpreter_lock::is_held_by_current_thread());
    Ok(())
}

#[test]
fn test_callers_already_attached_do_not_deadlock() -> Result<(), BridgeError> {
    global_handler()?;
    let results = thread::scope(|s| {
        let handles = (100..100 + WORKERS)
            .map(|tag| {
                // Each worker enters the handler while holding the GIL itself
                s.spawn(move || Python::attach(|_py| record_call(tag)))
            })
            .collect();
        join_all(handles)
    });

    let tags = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(tags.len(), WORKERS as usize);

    let intervals = recorded_intervals(100..200)?;
    assert_eq!(intervals.len(), WORKERS as usize);
    assert_serialized(&intervals);
    Ok(())
}
