use std::env;
use std::path::Path;

use faves_core::util::normalize_base_url;
use serde::Serialize;

use crate::auth::TokenStore;
use crate::cli::ConfigCommands;
use crate::config_profiles::{normalize_text_option, CliProfile, CliProfilesConfig};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct ProfileView<'a> {
    profile: &'a str,
    active: bool,
    api_base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    token_stored: bool,
}

pub fn run_config(
    command: ConfigCommands,
    global_profile: Option<&str>,
    config_path: &Path,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            api_base_url,
            request_timeout_secs,
            no_activate,
        } => {
            let env_base_url = normalize_text_option(env::var("FAVES_API_BASE_URL").ok());
            let (profile_name, profile) = run_config_init(
                config_path,
                profile.as_deref().or(global_profile),
                api_base_url,
                env_base_url,
                request_timeout_secs,
                no_activate,
            )?;
            println!("Saved profile '{profile_name}' to {}", config_path.display());
            if profile.api_base_url.is_none() {
                println!("Profile '{profile_name}' has no API base URL yet; pass --api-base-url.");
            }
            Ok(())
        }
        ConfigCommands::Show { profile, json } => {
            run_config_show(config_path, profile.as_deref().or(global_profile), json)
        }
    }
}

/// Merge explicit flags over the environment over the stored profile, then save.
pub fn run_config_init(
    config_path: &Path,
    profile_name: Option<&str>,
    api_base_url: Option<String>,
    env_base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    no_activate: bool,
) -> Result<(String, CliProfile), CliError> {
    let mut config = CliProfilesConfig::load_from_path(config_path).map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing_profile = config.profile(&profile_name).cloned().unwrap_or_default();

    let merged_api_base_url = normalize_text_option(api_base_url)
        .or(env_base_url)
        .or_else(|| existing_profile.api_base_url())
        .map(|url| normalize_base_url(&url).map_err(CliError::Config))
        .transpose()?;
    if request_timeout_secs == Some(0) {
        return Err(CliError::Config(
            "--request-timeout-secs must be a positive integer".into(),
        ));
    }

    let profile = config.profile_mut_or_default(&profile_name);
    profile.api_base_url = merged_api_base_url;
    profile.request_timeout_secs = request_timeout_secs.or(existing_profile.request_timeout_secs);
    let saved = profile.clone();

    if !no_activate || config.active_profile.is_none() {
        config.active_profile = Some(profile_name.clone());
    }
    config.save_to_path(config_path).map_err(CliError::Config)?;

    Ok((profile_name, saved))
}

fn run_config_show(
    config_path: &Path,
    profile_name: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    let config = CliProfilesConfig::load_from_path(config_path).map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let Some(profile) = config.profile(&profile_name) else {
        println!("Profile '{profile_name}' is not configured.");
        return Ok(());
    };

    let token_stored = TokenStore::new(&profile_name)
        .load()
        .map_err(|error| CliError::Auth(error.to_string()))?
        .is_some();
    let view = ProfileView {
        profile: &profile_name,
        active: config.active_profile.as_deref() == Some(profile_name.as_str()),
        api_base_url: profile.api_base_url(),
        request_timeout_secs: profile.request_timeout_secs,
        token_stored,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        let active = if view.active { " (active)" } else { "" };
        println!("Profile:      {}{active}", view.profile);
        println!(
            "API base URL: {}",
            view.api_base_url.as_deref().unwrap_or("(not set)")
        );
        if let Some(secs) = view.request_timeout_secs {
            println!("Timeout:      {secs}s");
        }
        println!(
            "Token:        {}",
            if view.token_stored { "stored" } else { "none" }
        );
    }
    Ok(())
}
