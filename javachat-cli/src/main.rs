use anyhow::Result;
use clap::Parser;
use javachat_cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.json_logs {
        javachat_telemetry::init_json_telemetry("javachat-cli");
    } else {
        javachat_telemetry::init_telemetry("javachat-cli");
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    javachat_cli::run(cli, &mut out).await
}
