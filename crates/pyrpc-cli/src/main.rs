use clap::{Parser, Subcommand};
use pyrpc_cli::commands::{
    call::{self, CallCommand},
    check,
    config::{self, ConfigAction},
};
use pyrpc_cli::errors::CliError;
use pyrpc_cli::GlobalOpts;
use pyrpc_logger as logger;

#[derive(Parser)]
#[command(name = "pyrpc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Python RPC bridge",
    long_about = "pyrpc runs Python functions through the same handler RPC workers use, and manages its configuration."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or change the bridge configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Load the internal module and verify its RPC entry points
    Check,
    /// Call module:function through the RPC handler and print the result
    Call(CallCommand),
}

fn main() {
    let cli = Cli::parse();

    let logger_init = match cli.global.log_file {
        Some(ref path) => {
            logger::set_verbosity(cli.global.verbosity_level());
            logger::set_quiet(cli.global.quiet);
            logger::init_with_file(path)
        }
        None => logger::init_with_verbosity(cli.global.verbosity_level(), cli.global.quiet),
    };
    if let Err(e) = logger_init {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }

    let result: Result<(), CliError> = match cli.command {
        Commands::Config { action } => config::handle_config(action, &cli.global),
        Commands::Check => check::handle_check(&cli.global),
        Commands::Call(cmd) => call::handle_call(cmd, &cli.global),
    };

    if let Err(e) = result {
        logger::error(&e.to_string());
        if cli.global.verbosity_level() > 0 {
            logger::show_log_path();
        }
        std::process::exit(1);
    }
}
