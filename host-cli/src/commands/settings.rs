use anyhow::{bail, Context as _, Result};
use bridge_traits::{DuplexMode, PageOrientation};
use clap::{Args, Subcommand, ValueEnum};
use core_service::{PrintSettings, PrintSettingsPatch, Setting};
use serde::Serialize;

use crate::output::OutputFormat;
use crate::Context;

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show the saved print settings
    Show,
    /// Change one or more print settings
    Set(SetArgs),
    /// Restore the default print settings
    Reset,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Open each document in the default viewer instead of printing silently
    #[arg(long)]
    pub preview: Option<bool>,

    /// Scale pages to the paper
    #[arg(long)]
    pub fit: Option<bool>,

    #[arg(long, value_enum)]
    pub orientation: Option<OrientationArg>,

    /// Paper size such as A4 or Letter, or "auto"
    #[arg(long, value_parser = parse_text)]
    pub paper_size: Option<Setting<String>>,

    /// Number of copies, or "auto"
    #[arg(long, value_parser = parse_copies)]
    pub copies: Option<Setting<u32>>,

    #[arg(long, value_enum)]
    pub duplex: Option<DuplexArg>,

    /// Printer name, or "auto" for the system default
    #[arg(long, value_parser = parse_text)]
    pub printer: Option<Setting<String>>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OrientationArg {
    Auto,
    Portrait,
    Landscape,
}

impl From<OrientationArg> for Setting<PageOrientation> {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Auto => Setting::Auto,
            OrientationArg::Portrait => Setting::Value(PageOrientation::Portrait),
            OrientationArg::Landscape => Setting::Value(PageOrientation::Landscape),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DuplexArg {
    Auto,
    Simplex,
    Short,
    Long,
}

impl From<DuplexArg> for Setting<DuplexMode> {
    fn from(arg: DuplexArg) -> Self {
        match arg {
            DuplexArg::Auto => Setting::Auto,
            DuplexArg::Simplex => Setting::Value(DuplexMode::Simplex),
            DuplexArg::Short => Setting::Value(DuplexMode::Short),
            DuplexArg::Long => Setting::Value(DuplexMode::Long),
        }
    }
}

fn parse_text(value: &str) -> Result<Setting<String>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("value must not be empty".to_string());
    }
    if value.eq_ignore_ascii_case("auto") {
        return Ok(Setting::Auto);
    }
    Ok(Setting::Value(value.to_string()))
}

fn parse_copies(value: &str) -> Result<Setting<u32>, String> {
    if value.trim().eq_ignore_ascii_case("auto") {
        return Ok(Setting::Auto);
    }
    match value.trim().parse::<u32>() {
        Ok(0) => Err("copies must be at least 1".to_string()),
        Ok(n) => Ok(Setting::Value(n)),
        Err(_) => Err(format!("'{}' is not a number", value)),
    }
}

impl SetArgs {
    fn to_patch(&self) -> PrintSettingsPatch {
        PrintSettingsPatch {
            preview: self.preview,
            fit: self.fit,
            orientation: self.orientation.map(Into::into),
            paper_size: self.paper_size.clone(),
            copies: self.copies.clone(),
            duplex: self.duplex.map(Into::into),
            printer: self.printer.clone(),
        }
    }
}

impl SettingsCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let settings = match self {
            SettingsCommand::Show => ctx
                .service
                .get_settings()
                .await
                .context("Failed to load print settings")?,
            SettingsCommand::Set(args) => {
                let patch = args.to_patch();
                if patch.is_empty() {
                    bail!("Nothing to change. See `drive-print settings set --help`.");
                }
                let settings = ctx
                    .service
                    .update_settings(&patch)
                    .await
                    .context("Failed to save print settings")?;
                ctx.out.success("Settings saved");
                settings
            }
            SettingsCommand::Reset => {
                let settings = PrintSettings::default();
                ctx.service
                    .save_settings(&settings)
                    .await
                    .context("Failed to save print settings")?;
                ctx.out.success("Settings reset to defaults");
                settings
            }
        };

        show(ctx, &settings)
    }
}

fn show(ctx: &Context, settings: &PrintSettings) -> Result<()> {
    if ctx.format == OutputFormat::Json {
        ctx.out.print_json(&serde_json::to_value(settings)?);
        return Ok(());
    }

    println!("{:<12} {}", "preview", settings.preview);
    println!("{:<12} {}", "fit", settings.fit);
    println!("{:<12} {}", "orientation", describe(&settings.orientation));
    println!("{:<12} {}", "paper size", describe(&settings.paper_size));
    println!("{:<12} {}", "copies", describe(&settings.copies));
    println!("{:<12} {}", "duplex", describe(&settings.duplex));
    println!(
        "{:<12} {}",
        "printer",
        settings.printer.as_deref().unwrap_or("auto")
    );
    Ok(())
}

fn describe<T: Serialize>(setting: &Setting<T>) -> String {
    match serde_json::to_value(setting) {
        Ok(serde_json::Value::String(text)) => text,
        Ok(value) => value.to_string(),
        Err(_) => "?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_copies() {
        assert_eq!(parse_copies("auto"), Ok(Setting::Auto));
        assert_eq!(parse_copies("3"), Ok(Setting::Value(3)));
        assert!(parse_copies("0").is_err());
        assert!(parse_copies("many").is_err());
    }

    #[test]
    fn test_parse_text_trims_and_accepts_auto() {
        assert_eq!(parse_text(" A4 "), Ok(Setting::Value("A4".to_string())));
        assert_eq!(parse_text("AUTO"), Ok(Setting::Auto));
        assert!(parse_text("  ").is_err());
    }

    #[test]
    fn test_set_args_build_patch() {
        let args = SetArgs {
            preview: Some(true),
            fit: None,
            orientation: Some(OrientationArg::Landscape),
            paper_size: None,
            copies: Some(Setting::Value(2)),
            duplex: Some(DuplexArg::Auto),
            printer: None,
        };
        let patch = args.to_patch();

        assert_eq!(patch.preview, Some(true));
        assert_eq!(
            patch.orientation,
            Some(Setting::Value(PageOrientation::Landscape))
        );
        assert_eq!(patch.copies, Some(Setting::Value(2)));
        assert_eq!(patch.duplex, Some(Setting::Auto));
        assert!(patch.fit.is_none());
    }
}
