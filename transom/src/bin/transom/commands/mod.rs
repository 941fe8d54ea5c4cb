pub mod cache_key;
pub mod candidates;
pub mod check;

use std::path::Path;

use anyhow::{Context, Result, bail};
use transom::{LanguageConfig, TransomSettings};

use crate::output::OutputManager;

/// Reads and validates a settings file, printing every configuration issue.
pub fn load_settings(path: &Path, output: &OutputManager) -> Result<(TransomSettings, LanguageConfig)> {
    let settings = TransomSettings::from_path(path)
        .map_err(|err| report_issues(&err, output))
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    let config = LanguageConfig::from_settings(&settings)
        .map_err(|err| report_issues(&err, output))
        .with_context(|| format!("invalid language configuration in {}", path.display()))?;
    Ok((settings, config))
}

fn report_issues(err: &transom::ConfigError, output: &OutputManager) -> anyhow::Error {
    for issue in &err.issues {
        output.error(&format!("{} [{}]: {}", issue.path, issue.code, issue.message));
    }
    match err.issues.len() {
        1 => anyhow::anyhow!("1 configuration issue"),
        count => anyhow::anyhow!("{count} configuration issues"),
    }
}

pub fn parse_scope(raw: &str) -> Result<transom::Scope> {
    if raw.trim().is_empty() {
        bail!("scope must not be empty");
    }
    Ok(transom::Scope::new(raw.trim()))
}
