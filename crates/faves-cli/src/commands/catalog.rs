use faves_core::TargetKind;

use crate::commands::common::{format_catalog_line, CliEngine};
use crate::error::CliError;

pub async fn run_catalog(engine: &CliEngine, id: &str, as_json: bool) -> Result<(), CliError> {
    let catalog = engine.catalog(id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
    } else {
        let favorited = engine.is_favorite(TargetKind::Catalog, &catalog.id).await;
        println!("{}", format_catalog_line(&catalog, favorited));
    }
    Ok(())
}
