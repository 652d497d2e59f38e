use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use fundsplit::cli::commands::execute_command;
use fundsplit::cli::{output, Cli, CliError};
use fundsplit::config::Settings;
use fundsplit::infrastructure::di::ServiceContainer;

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        output::error(&e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let cwd = std::env::current_dir().ok();
    let mut settings = Settings::load(cwd.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        settings.override_data_dir(dir);
    }
    tracing::debug!("settings: {:?}", settings);

    let container = ServiceContainer::new(settings)?;
    execute_command(cli, &container)
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        3 => LevelFilter::TRACE,
        _ => {
            eprintln!("Don't be crazy, max is -v -v -v");
            LevelFilter::TRACE
        }
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();

    match filter {
        LevelFilter::INFO => tracing::info!("Debug mode: info"),
        LevelFilter::DEBUG => tracing::debug!("Debug mode: debug"),
        LevelFilter::TRACE => tracing::debug!("Debug mode: trace"),
        _ => {}
    }
}
