//! Bridge history binary

fn main() {
    use bridge_history_node::{BridgeHistoryNode, Cli};
    use clap::Parser;

    init_tracing_subscriber();

    // Enable backtraces unless a RUST_BACKTRACE value has already been explicitly provided.
    if std::env::var_os("RUST_BACKTRACE").is_none() {
        std::env::set_var("RUST_BACKTRACE", "1");
    }

    let cli = Cli::parse();
    if let Err(err) = cli.config.validate(&cli.command) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(eyre::Report::from)
        .and_then(|runtime| runtime.block_on(BridgeHistoryNode::new(cli.config).run(cli.command)));

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber, filtered by `RUST_LOG` with a fallback to `info`.
fn init_tracing_subscriber() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(false)
                .with_ansi(true),
        )
        .with(filter)
        .init();
}
