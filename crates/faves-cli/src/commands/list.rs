use faves_core::TargetKind;

use crate::commands::common::{
    favorite_to_list_item, format_favorite_lines, sync_or_warn, CliEngine, FavoriteListItem,
};
use crate::error::CliError;

pub async fn run_list(
    engine: &CliEngine,
    kind: Option<TargetKind>,
    sync_first: bool,
    as_json: bool,
) -> Result<(), CliError> {
    if sync_first {
        sync_or_warn(engine).await;
    }
    let favorites = engine.list(kind).await;

    if as_json {
        let json_items = favorites
            .iter()
            .map(favorite_to_list_item)
            .collect::<Vec<FavoriteListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if favorites.is_empty() {
        println!("No favorites yet.");
        return Ok(());
    }

    for line in format_favorite_lines(&favorites) {
        println!("{line}");
    }
    if !engine.status().await.synced {
        println!("(provisional: run `faves sync` to refresh from the server)");
    }
    Ok(())
}
