use clap::Parser;
use nws_history::cli::{run, Cli};
use nws_history::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
