use clap::Parser;

use dronesim::cli::DronesimArgs;
use dronesim::logs::SessionLogger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Argument failures follow the same convention as every other validated
    // precondition: diagnostic out, exit 1. Help and version still exit 0.
    let args = match DronesimArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            e.print()?;
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    // Logging is best-effort; a missing home directory disables it silently
    let logger = SessionLogger::new().await;

    if let Err(e) = dronesim::run(args.command, logger).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
    Ok(())
}
