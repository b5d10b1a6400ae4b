use std::process::ExitCode;

use clap::Parser as _;
use nexus_script::cli::{
    self, Args,
    args::{ArgumentError, CALL_ARGS_ENV, with_call_args},
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let call_args = std::env::var(CALL_ARGS_ENV).ok();
    let argv = with_call_args(call_args.as_deref(), std::env::args_os());
    let args = match Args::try_parse_from(argv) {
        Ok(args) => args,
        Err(err) => {
            // clap reports `--help` and `--version` as errors too, on stdout.
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Initialize tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli::log_filter(args.verbosity)));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();

    match cli::execute(&args, &mut std::io::stdout()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ArgumentError>() {
                Some(err) => eprintln!("{err}"),
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
