//! A module whose entry point is not callable never yields a handler

mod common;

use common::test_config;
use pyrpc_python::{BridgeError, PythonRpcHandler, RpcRuntime};

#[test]
fn test_non_callable_entry_point_is_rejected_once() -> Result<(), BridgeError> {
    RpcRuntime::install_global(test_config("broken_internal"))?;

    match PythonRpcHandler::get_instance() {
        Err(BridgeError::EntryPoint { name, reason }) => {
            assert_eq!(name, pyrpc_python::SERIALIZE);
            assert!(reason.contains("not callable"), "{}", reason);
        }
        Err(other) => panic!("expected an entry point error, got {other}"),
        Ok(_) => panic!("broken_internal must not produce a handler"),
    }

    // Cached, not retried
    assert!(matches!(
        PythonRpcHandler::get_instance(),
        Err(BridgeError::EntryPoint { ref name, .. }) if name == pyrpc_python::SERIALIZE
    ));
    Ok(())
}
