use crate::commands::common::CliEngine;
use crate::error::CliError;

pub async fn run_sync(engine: &CliEngine) -> Result<(), CliError> {
    let count = engine.sync_from_server().await?;
    println!("Sync completed: {count} favorites");
    Ok(())
}
