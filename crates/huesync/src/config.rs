//! CLI-side configuration: the config file plus command-line overrides.

use std::path::PathBuf;

use huesync_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// A loaded configuration and the file it came from.
pub struct Resolved {
    pub config: Config,
    pub path: PathBuf,
}

/// Load the config file, then apply `--host` / `--credential`.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(huesync_config::config_path);

    let mut config = huesync_config::load_config_from(&path)?;
    if let Some(host) = &global.host {
        config.host.clone_from(host);
    }
    if let Some(credential) = &global.credential {
        config.credential = Some(credential.clone());
    }

    config.validate().map_err(|e| match CliError::from(e) {
        CliError::Validation { field, reason, .. } => CliError::Validation {
            field,
            reason,
            path: path.display().to_string(),
        },
        other => other,
    })?;

    tracing::debug!(host = %config.host, path = %path.display(), "configuration resolved");
    Ok(Resolved { config, path })
}
