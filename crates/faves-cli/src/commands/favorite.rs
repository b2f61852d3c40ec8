use faves_core::{TargetKey, TargetKind};

use crate::commands::common::CliEngine;
use crate::error::CliError;

pub async fn run_toggle(engine: &CliEngine, kind: TargetKind, id: &str) -> Result<(), CliError> {
    let key = TargetKey::parse(kind, id)?;
    let favorited = engine.toggle_favorite(kind, id).await?;
    println!("{}", toggle_message(&key, favorited));
    Ok(())
}

pub async fn run_add(engine: &CliEngine, kind: TargetKind, id: &str) -> Result<(), CliError> {
    let key = TargetKey::parse(kind, id)?;
    engine.add_favorite(kind, id).await?;
    println!("{}", toggle_message(&key, true));
    Ok(())
}

pub async fn run_remove(engine: &CliEngine, kind: TargetKind, id: &str) -> Result<(), CliError> {
    let key = TargetKey::parse(kind, id)?;
    engine.remove_favorite(kind, id).await?;
    println!("{}", toggle_message(&key, false));
    Ok(())
}

pub fn toggle_message(key: &TargetKey, favorited: bool) -> String {
    if favorited {
        format!("Favorited {key}")
    } else {
        format!("Unfavorited {key}")
    }
}
