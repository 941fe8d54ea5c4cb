use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};
use serde::Serialize;
use transom::{FallbackResolver, LanguageCode, ResolveMode};

use crate::commands::{load_settings, parse_scope};
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Resolution Order",
    commands: &[
        "transom candidates transom.toml --language de              # Fallback order in the global scope",
        "transom candidates transom.toml --scope 2 --language fr_CA # Variant lookup for site 2",
        "transom candidates transom.toml --language nl --mode any   # Any-language order",
    ],
}];

#[derive(Args)]
pub struct CandidatesArgs {
    /// Settings file (TOML, or JSON with a .json extension)
    pub settings: PathBuf,

    /// Scope to resolve in
    #[arg(long, default_value = "global")]
    pub scope: String,

    /// Requested language code
    #[arg(long)]
    pub language: String,

    /// Resolution mode: strict, fallback or any
    #[arg(long, default_value = "fallback")]
    pub mode: ResolveMode,
}

#[derive(Debug, Serialize)]
pub struct CandidateReport {
    pub scope: String,
    pub requested: LanguageCode,
    pub mode: ResolveMode,
    pub configured: bool,
    pub candidates: Vec<LanguageCode>,
    pub active_choices: Vec<LanguageCode>,
}

impl TableDisplay for CandidateReport {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, &["#", "Language", "Visible"]);
        for (position, code) in self.candidates.iter().enumerate() {
            table.add_row(vec![
                Cell::new(position + 1),
                Cell::new(code),
                Cell::new(if self.active_choices.contains(code) { "yes" } else { "no" }),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        let codes: Vec<&str> = self.candidates.iter().map(LanguageCode::as_str).collect();
        codes.join(" ")
    }
}

pub fn handle_candidates(args: CandidatesArgs, output: &OutputManager) -> Result<()> {
    output.heading("Candidate Languages");
    let (_, config) = load_settings(&args.settings, output)?;
    let scope = parse_scope(&args.scope)?;
    let requested = LanguageCode::parse(&args.language)
        .with_context(|| format!("'{}' is not a language code", args.language))?;

    let config = Arc::new(config);
    let resolver = FallbackResolver::new(Arc::clone(&config));
    let candidates = resolver
        .candidates_for(&scope, &requested, args.mode)
        .context("failed to compute candidates")?;

    let configured = config.is_configured(&scope, &requested);
    if !config.has_scope(&scope) {
        output.warning(&format!(
            "scope '{scope}' is not configured; using the default language only"
        ));
    }
    if !configured {
        output.warning(&format!("'{requested}' is not configured for scope '{scope}'"));
    }
    if args.mode == ResolveMode::AnyLanguage {
        output.info("any-language order depends on which translations an object has");
    }

    let report = CandidateReport {
        scope: scope.to_string(),
        active_choices: config.active_choices(&scope, &requested),
        requested,
        mode: args.mode,
        configured,
        candidates,
    };
    output.display(&report)
}
