use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};
use serde::Serialize;
use transom::{LanguageCode, PrimaryKey, keys::KeyContext};

use crate::commands::load_settings;
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Cache Keys",
    commands: &[
        "transom cache-key transom.toml --app blog --model article --pk 42 --language en",
        "transom cache-key transom.toml --app blog --model article --pk 42 --all-languages --database replica",
    ],
}];

#[derive(Args)]
pub struct CacheKeyArgs {
    /// Settings file (TOML, or JSON with a .json extension)
    pub settings: PathBuf,

    /// Application namespace of the model
    #[arg(long)]
    pub app: String,

    /// Model name
    #[arg(long)]
    pub model: String,

    /// Primary key of the master row
    #[arg(long)]
    pub pk: String,

    /// Database alias (defaults to the configured default database)
    #[arg(long)]
    pub database: Option<String>,

    /// Language code
    #[arg(long, conflicts_with = "all_languages", required_unless_present = "all_languages")]
    pub language: Option<String>,

    /// Print the key of every configured language, as invalidated on delete
    #[arg(long)]
    pub all_languages: bool,
}

#[derive(Debug, Serialize)]
pub struct CacheKeyRow {
    pub language: LanguageCode,
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct CacheKeyReport {
    pub keys: Vec<CacheKeyRow>,
}

impl TableDisplay for CacheKeyReport {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, &["Language", "Key"]);
        for row in &self.keys {
            table.add_row(vec![Cell::new(&row.language), Cell::new(&row.key)]);
        }
        table
    }

    fn to_compact(&self) -> String {
        let keys: Vec<&str> = self.keys.iter().map(|row| row.key.as_str()).collect();
        keys.join("\n")
    }
}

pub fn handle_cache_key(args: CacheKeyArgs, output: &OutputManager) -> Result<()> {
    output.heading("Cache Keys");
    let (settings, config) = load_settings(&args.settings, output)?;

    let languages = match &args.language {
        Some(raw) => vec![LanguageCode::parse(raw).with_context(|| format!("'{raw}' is not a language code"))?],
        None => config.all_languages(),
    };
    let database = args.database.as_deref().unwrap_or(&settings.default_database);
    let pk = PrimaryKey::new(args.pk.clone());
    let ctx = KeyContext::new(&settings.cache_prefix, &args.app);

    if !settings.enable_caching {
        output.warning("Caching is disabled in these settings; the keys are never written");
    }

    let report = CacheKeyReport {
        keys: languages
            .into_iter()
            .map(|language| CacheKeyRow {
                key: ctx.translation(&args.model, database, &pk, &language),
                language,
            })
            .collect(),
    };
    output.display(&report)
}
