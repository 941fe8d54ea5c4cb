use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};
use serde::Serialize;
use transom::{LanguageConfig, TransomSettings};

use crate::commands::load_settings;
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Validate Settings",
    commands: &[
        "transom check transom.toml            # Validate and list every scope",
        "transom --output json check site.json # Machine-readable language table",
    ],
}];

#[derive(Args)]
pub struct CheckArgs {
    /// Settings file (TOML, or JSON with a .json extension)
    pub settings: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct LanguageRow {
    pub scope: String,
    pub position: usize,
    pub code: String,
    pub fallbacks: Vec<String>,
    pub hide_untranslated: bool,
}

#[derive(Debug, Serialize)]
pub struct ConfigReport {
    pub default_language: String,
    pub default_fallbacks: Vec<String>,
    pub caching: bool,
    pub cache_prefix: String,
    pub default_database: String,
    pub languages: Vec<LanguageRow>,
}

impl ConfigReport {
    pub fn build(settings: &TransomSettings, config: &LanguageConfig) -> Self {
        let mut languages = Vec::new();
        for scope in config.scopes() {
            for (position, entry) in config.languages(scope).iter().enumerate() {
                languages.push(LanguageRow {
                    scope: scope.to_string(),
                    position: position + 1,
                    code: entry.code.to_string(),
                    fallbacks: entry.fallbacks.iter().map(ToString::to_string).collect(),
                    hide_untranslated: entry.hide_untranslated,
                });
            }
        }
        Self {
            default_language: config.default_language().to_string(),
            default_fallbacks: config.defaults().fallbacks.iter().map(ToString::to_string).collect(),
            caching: settings.enable_caching,
            cache_prefix: settings.cache_prefix.clone(),
            default_database: settings.default_database.clone(),
            languages,
        }
    }
}

impl TableDisplay for ConfigReport {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, &["Scope", "#", "Code", "Fallbacks", "Hide untranslated"]);
        for row in &self.languages {
            table.add_row(vec![
                Cell::new(&row.scope),
                Cell::new(row.position),
                Cell::new(&row.code),
                Cell::new(if row.fallbacks.is_empty() {
                    "-".to_string()
                } else {
                    row.fallbacks.join(" → ")
                }),
                Cell::new(if row.hide_untranslated { "yes" } else { "no" }),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        let scopes: Vec<String> = self
            .languages
            .iter()
            .map(|row| format!("{}:{}", row.scope, row.code))
            .collect();
        format!("default={} {}", self.default_language, scopes.join(","))
    }
}

pub fn handle_check(args: CheckArgs, output: &OutputManager) -> Result<()> {
    output.heading("Language Settings");
    let (settings, config) = load_settings(&args.settings, output)?;
    let report = ConfigReport::build(&settings, &config);

    output.key_value("Default language", &report.default_language);
    output.key_value("Default fallbacks", &report.default_fallbacks.join(", "));
    output.key_value("Default database", &report.default_database);
    if report.caching {
        let prefix = if report.cache_prefix.is_empty() {
            "(none)"
        } else {
            report.cache_prefix.as_str()
        };
        output.key_value("Cache prefix", prefix);
    } else {
        output.warning("Caching is disabled; every read goes to storage");
    }
    if report.languages.is_empty() {
        output.warning("No scopes configured; every scope uses the default language only");
    }

    output.display(&report)?;
    output.success(&format!("{} is valid", args.settings.display()));
    Ok(())
}
