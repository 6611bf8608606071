use anyhow::{bail, Context as _, Result};
use clap::Args;

use crate::output::OutputFormat;
use crate::Context;

#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Ids or names of the documents to delete
    pub files: Vec<String>,

    /// Delete every document in the folder (after --filter)
    #[arg(long, conflicts_with = "files", requires = "yes")]
    pub all: bool,

    /// With --all, only delete documents whose name contains this text
    #[arg(long, short, requires = "all")]
    pub filter: Option<String>,

    /// Confirm a bulk delete
    #[arg(long)]
    pub yes: bool,
}

impl DeleteCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        if !self.all && self.files.is_empty() {
            bail!("Name the documents to delete, or pass --all --yes");
        }

        let catalog = ctx
            .service
            .refresh_catalog()
            .await
            .context("Failed to list the folder")?;
        let targets = if self.all {
            super::visible(catalog, self.filter.as_deref())
        } else {
            super::resolve(&catalog, &self.files)?
        };

        if let [file] = targets.as_slice() {
            ctx.service
                .delete_one(&file.id)
                .await
                .with_context(|| format!("Failed to delete {}", file.name))?;
            ctx.out.success(&format!("Deleted {}", file.name));
            return Ok(());
        }

        let ids: Vec<String> = targets.iter().map(|f| f.id.clone()).collect();
        let report = ctx.service.delete_all(&ids).await;

        if ctx.format == OutputFormat::Json {
            ctx.out.print_json(&serde_json::to_value(&report)?);
            return Ok(());
        }

        for (file_id, message) in &report.failed {
            let name = targets
                .iter()
                .find(|f| f.id == *file_id)
                .map_or(file_id.as_str(), |f| f.name.as_str());
            ctx.out.warn(&format!("{}: {}", name, message));
        }
        ctx.out.success(&format!(
            "Deleted {} of {} document(s)",
            report.deleted.len(),
            ids.len()
        ));
        Ok(())
    }
}
