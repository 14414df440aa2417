//! Primary entrypoint for the `docrag` CLI binary.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let exit_code = docrag_cli::run().await?;
    std::process::exit(exit_code);
}
