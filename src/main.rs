use clap::Parser;
use routeguard::cli::{run_cli, Cli};
use routeguard::logging::{init_logging, LogConfig};

fn main() -> anyhow::Result<()> {
    let mut log = LogConfig::from_env();
    // Registration logs are noise for one-shot commands.
    if std::env::var_os("ROUTEGUARD_LOG_LEVEL").is_none() {
        log.log_level = "warn".to_string();
    }
    init_logging(&log)?;

    let cli = Cli::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_cli(&cli, &mut out)
}
