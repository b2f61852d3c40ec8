use crate::auth::TokenStore;
use crate::cli::AuthCommands;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    match command {
        AuthCommands::Login { profile, token } => {
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            TokenStore::new(&profile_name)
                .save(&token)
                .map_err(|error| CliError::Auth(error.to_string()))?;
            if config.profile(&profile_name).is_none() {
                println!(
                    "Profile '{profile_name}' is not configured yet. Run `faves config init --profile {profile_name}`."
                );
            }
            println!("Stored access token for profile '{profile_name}'");
            Ok(())
        }
        AuthCommands::Status { profile } => {
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            let stored = TokenStore::new(&profile_name)
                .load()
                .map_err(|error| CliError::Auth(error.to_string()))?;
            if stored.is_some() {
                println!("Profile '{profile_name}' has a stored access token.");
            } else {
                println!("Profile '{profile_name}' is not signed in.");
            }
            Ok(())
        }
        AuthCommands::Logout { profile } => {
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            let removed = TokenStore::new(&profile_name)
                .clear()
                .map_err(|error| CliError::Auth(error.to_string()))?;
            if removed {
                println!("Signed out profile '{profile_name}'");
            } else {
                println!("Profile '{profile_name}' had no stored token.");
            }
            Ok(())
        }
    }
}
