use anyhow::{Context as _, Result};
use clap::Args;

use crate::output::OutputFormat;
use crate::Context;

#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only show documents whose name contains this text
    #[arg(long, short)]
    pub filter: Option<String>,
}

impl ListCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let files = ctx
            .service
            .refresh_catalog()
            .await
            .context("Failed to list the folder")?;
        let files = super::visible(files, self.filter.as_deref());

        if ctx.format == OutputFormat::Json {
            ctx.out.print_json(&serde_json::to_value(&files)?);
            return Ok(());
        }

        if files.is_empty() {
            ctx.out.info("No files found.");
            return Ok(());
        }

        for file in &files {
            let modified = file
                .modified_time
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("{:<48} {:<17} {}", file.name, modified, file.id);
        }
        ctx.out.success(&format!("{} document(s)", files.len()));
        Ok(())
    }
}
