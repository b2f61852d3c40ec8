use crate::commands::common::{format_status_lines, status_report, sync_or_warn, Session};
use crate::error::CliError;

pub async fn run_status(session: &Session, sync_first: bool, as_json: bool) -> Result<(), CliError> {
    if sync_first {
        sync_or_warn(&session.engine).await;
    }
    let favorites = session.engine.list(None).await.len();
    let report = status_report(
        &session.profile,
        session.api_base_url(),
        favorites,
        session.engine.status().await,
    );

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_status_lines(&report) {
            println!("{line}");
        }
    }
    Ok(())
}
