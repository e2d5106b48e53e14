use crate::errors::CliError;
use crate::GlobalOpts;
use colored::*;
use pyrpc_config::Config;
use pyrpc_logger as logger;
use pyrpc_python::{interpreter_lock, RpcRuntime};

/// Build the handler from the current config and list its entry points
pub fn handle_check(opts: &GlobalOpts) -> Result<(), CliError> {
    let config = Config::load()?;
    logger::step(&format!(
        "Resolving RPC entry points from {}",
        config.module_path
    ));

    let runtime = RpcRuntime::install_global(config)?;
    let report = describe(runtime, opts);
    runtime.shutdown()?;
    report?;

    logger::success("RPC handler is ready");
    Ok(())
}

fn describe(runtime: &RpcRuntime, opts: &GlobalOpts) -> Result<(), CliError> {
    let handler = runtime.handler()?;
    let entry_points = handler.describe_entry_points()?;

    println!("{}", "RPC handler:".bold().green());
    println!("  {}: {}", "module".cyan(), handler.module_path());
    for (name, repr) in entry_points {
        println!("  {}: {}", name.cyan(), repr);
    }

    if opts.verbosity_level() > 0 {
        let stats = interpreter_lock::stats();
        println!(
            "  {}: {} acquisitions, {} slow, mean wait {:?}, max wait {:?}",
            "interpreter-lock".cyan(),
            stats.acquisitions,
            stats.slow_acquisitions,
            stats.mean_wait(),
            stats.max_wait
        );
    }
    Ok(())
}
