//! Ownership of the handler's lifecycle
//!
//! `RpcRuntime` decides when the handler is built (first use) and when it is
//! torn down (`shutdown`). The process-wide runtime behind
//! `PythonRpcHandler::get_instance` is created from the config file unless
//! `install_global` ran first.

use crate::errors::BridgeError;
use crate::handler::PythonRpcHandler;
use once_cell::sync::OnceCell;
use pyo3::Python;
use pyrpc_config::Config;
use pyrpc_logger as logger;
use std::sync::atomic::{AtomicBool, Ordering};

static GLOBAL_RUNTIME: OnceCell<Result<RpcRuntime, BridgeError>> = OnceCell::new();

pub struct RpcRuntime {
    config: Config,
    handler: OnceCell<Result<PythonRpcHandler, BridgeError>>,
    shut_down: AtomicBool,
}

impl RpcRuntime {
    pub(crate) fn new(config: Config) -> Self {
        Self {
            config,
            handler: OnceCell::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    /// The process-wide runtime, configured from `Config::load()` on first use.
    ///
    /// A config that fails to load is cached like any other initialization
    /// failure and returned to every later caller.
    pub fn global() -> Result<&'static RpcRuntime, BridgeError> {
        let slot = GLOBAL_RUNTIME.get_or_init(|| {
            let config = Config::load().map_err(|e| {
                logger::error(&format!("Failed to load config: {}", e));
                BridgeError::Initialization(format!("Failed to load config: {}", e))
            })?;
            logger::debug(&format!(
                "Global RPC runtime configured from {}",
                Config::path().display()
            ));
            Ok(RpcRuntime::new(config))
        });
        match slot {
            Ok(runtime) => Ok(runtime),
            Err(e) => Err(e.replay()),
        }
    }

    /// Configure the process-wide runtime explicitly.
    ///
    /// Fails if the global runtime already exists, whether it came from an
    /// earlier `install_global` or from `global()`.
    pub fn install_global(config: Config) -> Result<&'static RpcRuntime, BridgeError> {
        let mut installed = false;
        let slot = GLOBAL_RUNTIME.get_or_init(|| {
            installed = true;
            Ok(RpcRuntime::new(config))
        });
        match slot {
            Ok(runtime) if installed => Ok(runtime),
            Ok(_) => Err(BridgeError::Initialization(
                "global RPC runtime is already configured".to_string(),
            )),
            Err(e) => Err(e.replay()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The handler owned by this runtime, built on the first call.
    pub fn handler(&self) -> Result<&PythonRpcHandler, BridgeError> {
        let slot = match self.handler.get() {
            Some(slot) => slot,
            // Wait for a concurrent constructor with the GIL released, since
            // the constructor needs it
            None => Python::attach(|py| {
                py.detach(|| self.handler.get_or_init(|| self.construct()))
            }),
        };
        match slot {
            Ok(handler) => Ok(handler),
            Err(e) => Err(e.replay()),
        }
    }

    fn construct(&self) -> Result<PythonRpcHandler, BridgeError> {
        if self.is_shut_down() {
            return Err(BridgeError::ShutDown);
        }
        PythonRpcHandler::new(&self.config).inspect_err(|e| {
            logger::error(&format!("RPC handler initialization failed: {}", e));
        })
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Clear the handler's entry points and refuse to build one afterwards.
    ///
    /// Waits for an in-flight construction so its handler is cleaned up
    /// rather than left live.
    pub fn shutdown(&self) -> Result<(), BridgeError> {
        self.shut_down.store(true, Ordering::Release);
        let slot = Python::attach(|py| {
            py.detach(|| self.handler.get_or_init(|| Err(BridgeError::ShutDown)))
        });
        if let Ok(handler) = slot {
            handler.cleanup()?;
            logger::debug(&format!("RPC runtime for {} shut down", handler.module_path()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_before_first_use_blocks_construction() {
        let runtime = RpcRuntime::new(Config::default());
        assert!(runtime.shutdown().is_ok());
        assert!(runtime.is_shut_down());
        assert!(matches!(runtime.handler(), Err(BridgeError::ShutDown)));
        // Still refused on later calls
        assert!(matches!(runtime.handler(), Err(BridgeError::ShutDown)));
    }

    // The only test in this binary that builds a handler: its cleanup ends
    // handler construction for the whole process
    #[test]
    fn test_no_handler_is_built_after_teardown() -> Result<(), BridgeError> {
        let first = RpcRuntime::new(Config::default());
        assert!(first.handler()?.is_active());
        first.shutdown()?;

        let second = RpcRuntime::new(Config::default());
        assert!(!second.is_shut_down());
        assert!(matches!(second.handler(), Err(BridgeError::ShutDown)));
        assert!(matches!(
            PythonRpcHandler::new(&Config::default()),
            Err(BridgeError::ShutDown)
        ));
        Ok(())
    }
}
