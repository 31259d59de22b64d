//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`] or [`health`].

pub mod health;
pub mod run;

use crate::cli::{Cli, Commands};
use crate::error::AppError;

pub async fn dispatch(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Health(args)) => health::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  hookbridge v{version} \u{2014} HTTP and webhook to AMQP bridge\n\n  \
         No command provided. To get started:\n\n    \
         hookbridge run --amqp-url amqp://localhost     Start the bridge\n    \
         hookbridge run -c bridge.yaml                  Start with a config file\n    \
         hookbridge health                              Check a running instance\n    \
         hookbridge --help                              See all commands and options\n"
    );
}
