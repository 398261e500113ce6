//! Subcommand handlers.
//!
//! Every handler returns the text to print so the output can be checked
//! without capturing stdout.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use nwdconfig::{
    CategoryTier, ConfigFamily, ConfigRecord, FieldIssue, SchemaMap, Section, coerce,
    family::{default_record, suggest_filename},
    parse, serialize, validate_record,
};
use serde_json::json;
use tokio::fs;

use crate::{cli::Commands, config::CtlConfig, ctx::AppContext};

/// Handler for the `nwdctl` subcommands.
pub struct CommandHandler;

impl CommandHandler {
    /// Run one subcommand and return its output.
    ///
    /// # Errors
    ///
    /// Returns an error if a schema or input file cannot be read, or if
    /// `check` finds issues.
    pub async fn handle(ctx: &AppContext, command: &Commands) -> Result<String> {
        match command {
            Commands::Versions => Ok(Self::handle_versions(ctx)),
            Commands::Model { summary } => Self::handle_model(ctx, *summary).await,
            Commands::Kinds => Self::handle_kinds(ctx).await,
            Commands::New { name, kind, ini } => {
                Self::handle_new(ctx, name.as_deref(), kind.as_deref(), *ini).await
            }
            Commands::Render { record, output } => {
                Self::handle_render(ctx, record, output.as_deref()).await
            }
            Commands::Parse { file } => Self::handle_parse(ctx, file).await,
            Commands::Check { file } => Self::handle_check(ctx, file).await,
            Commands::ConfigSchema => CtlConfig::json_schema(),
        }
    }

    fn handle_versions(ctx: &AppContext) -> String {
        let selected = ctx.store.select(ctx.target);
        let mut out = format!("schema directory: {}\n", ctx.store.root().display());
        match ctx.target {
            Some(target) => out += &format!("target: systemd {target}\n"),
            None => out += "target: none (no version gating)\n",
        }
        if ctx.store.versions().is_empty() {
            out += "flat layout, no release directories\n";
        }
        for version in ctx.store.versions() {
            let name = format!("v{version}");
            if selected.is_some_and(|s| s.number() == *version) {
                out += &format!("{} {}\n", name.green().bold(), "(selected)".green());
            } else {
                out += &format!("{name}\n");
            }
        }
        out.trim_end().to_string()
    }

    async fn handle_model(ctx: &AppContext, summary: bool) -> Result<String> {
        let compiled = ctx.current().await?;
        if summary {
            return Ok(model_summary(&compiled.sections));
        }
        Ok(serde_json::to_string_pretty(&compiled.sections)?)
    }

    async fn handle_kinds(ctx: &AppContext) -> Result<String> {
        let compiled = ctx.compiled(ConfigFamily::Netdev).await?;
        let Some(kinds) = &compiled.kinds else {
            bail!("netdev schema has no kind map");
        };
        let value = json!({
            "universal": kinds.universal(),
            "kinds": kinds,
            "common": compiled.common_kinds,
        });
        Ok(serde_json::to_string_pretty(&value)?)
    }

    async fn handle_new(
        ctx: &AppContext,
        name: Option<&str>,
        kind: Option<&str>,
        ini: bool,
    ) -> Result<String> {
        let record = default_record(ctx.family, name, kind);
        if let Some(kind) = kind
            && ctx.family == ConfigFamily::Netdev
        {
            let compiled = ctx.compiled(ConfigFamily::Netdev).await?;
            if let Some(kinds) = &compiled.kinds
                && !kinds.contains(kind)
            {
                warn!("kind {kind} is not known to the netdev schema");
            }
        }

        let file = suggest_filename(ctx.family, &record);
        if !ini {
            if let Some(file) = &file {
                info!("suggested file name: {file}");
            }
            return Ok(serde_json::to_string_pretty(&record)?);
        }
        let compiled = ctx.current().await?;
        let body = serialize(&record, &compiled.sections);
        match file {
            Some(file) => Ok(format!("# {file}\n{body}")),
            None => Ok(body),
        }
    }

    async fn handle_render(ctx: &AppContext, record: &Path, output: Option<&Path>) -> Result<String> {
        let path = ctx.resolve_path(record);
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let record: ConfigRecord = content
            .parse()
            .with_context(|| format!("Failed to parse record {}", path.display()))?;

        let compiled = ctx.current().await?;
        let record = coerce(&record, &compiled.sections);
        let text = serialize(&record, &compiled.sections);

        let Some(output) = output else {
            return Ok(text);
        };
        let mut target = ctx.resolve_path(output);
        if fs::metadata(&target).await.is_ok_and(|m| m.is_dir()) {
            let Some(file) = suggest_filename(ctx.family, &record) else {
                bail!(
                    "cannot name the output file: the [{}] section has no name yet",
                    ctx.family.filename_section().unwrap_or_default()
                );
            };
            target = target.join(file);
        }
        fs::write(&target, format!("{text}\n"))
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;
        Ok(format!("{} {}", "written".green(), target.display()))
    }

    async fn handle_parse(ctx: &AppContext, file: &Path) -> Result<String> {
        let record = Self::load_ini(ctx, file).await?;
        Ok(serde_json::to_string_pretty(&record)?)
    }

    async fn handle_check(ctx: &AppContext, file: &Path) -> Result<String> {
        let issues = Self::check_file(ctx, file).await?;
        if issues.is_empty() {
            return Ok(format!("{} {}", "ok".green().bold(), file.display()));
        }
        for issue in &issues {
            println!("{} {issue}", "error:".red().bold());
        }
        bail!("{} issue(s) found in {}", issues.len(), file.display());
    }

    /// Parse and validate an INI file.
    pub async fn check_file(ctx: &AppContext, file: &Path) -> Result<Vec<FieldIssue>> {
        let record = Self::load_ini(ctx, file).await?;
        let compiled = ctx.current().await?;
        Ok(validate_record(&record, &compiled.sections))
    }

    async fn load_ini(ctx: &AppContext, file: &Path) -> Result<ConfigRecord> {
        let path = ctx.resolve_path(file);
        let text = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let compiled = ctx.current().await?;
        parse(&text, &compiled.sections).with_context(|| format!("Failed to load {}", path.display()))
    }
}

fn model_summary(sections: &SchemaMap) -> String {
    let mut out = String::new();
    for section in sections {
        out += &section_header(section);
        for option in &section.options {
            let ty = match option.element_type {
                Some(elem) => format!("{}<{}>", option.primary_type, elem),
                None => option.primary_type.to_string(),
            };
            let mut line = format!("  {:<40} {:<16} {}", option.key, ty, tier_label(option.tier));
            if option.required {
                line += &format!(" {}", "required".red());
            }
            if let Some(since) = option.since {
                line += &format!(" since {since}");
            }
            out += &line;
            out.push('\n');
        }
    }
    out.trim_end().to_string()
}

fn section_header(section: &Section) -> String {
    let mut header = format!("[{}]", section.name).bold().to_string();
    if section.multiple {
        header += &format!(" {}", "repeatable".cyan());
    }
    header += &format!(" {}\n", tier_label(section.tier));
    header
}

fn tier_label(tier: CategoryTier) -> String {
    match tier {
        CategoryTier::Basic => tier.as_str().green().to_string(),
        CategoryTier::Advanced => tier.as_str().yellow().to_string(),
        CategoryTier::Expert => tier.as_str().purple().to_string(),
    }
}
