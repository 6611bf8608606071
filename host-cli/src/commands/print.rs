use anyhow::{bail, Context as _, Result};
use clap::Args;
use core_runtime::events::PrintEvent;
use core_service::{CoreEvent, PrintRunReport, PrintStatus, RemoteFile};

use crate::output::OutputFormat;
use crate::Context;

#[derive(Debug, Args)]
pub struct PrintCommand {
    /// Ids or names of the documents to print
    pub files: Vec<String>,

    /// Print every document in the folder (after --filter)
    #[arg(long, conflicts_with = "files")]
    pub all: bool,

    /// With --all, only print documents whose name contains this text
    #[arg(long, short, requires = "all")]
    pub filter: Option<String>,
}

impl PrintCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        if !self.all && self.files.is_empty() {
            bail!("Name the documents to print, or pass --all");
        }

        let catalog = ctx
            .service
            .refresh_catalog()
            .await
            .context("Failed to list the folder")?;

        let run = self.dispatch(ctx, catalog);
        let mut events = ctx
            .service
            .subscribe()
            .filter(|event| matches!(event, CoreEvent::Print(_)));
        tokio::pin!(run);
        let mut cancelling = false;

        let result = loop {
            tokio::select! {
                result = &mut run => break result,
                Ok(event) = events.recv() => show_progress(ctx, &event),
                _ = tokio::signal::ctrl_c(), if !cancelling => {
                    cancelling = true;
                    ctx.out.warn("Cancelling after the current document");
                    let cancelled = ctx.service.cancel_print().await;
                    tracing::debug!(cancelled, "Interrupt received during print run");
                }
            }
        };
        while let Some(Ok(event)) = events.try_recv() {
            show_progress(ctx, &event);
        }
        let report = result?;

        if ctx.format == OutputFormat::Json {
            ctx.out.print_json(&serde_json::to_value(&report)?);
            return Ok(());
        }

        for failure in &report.failures {
            ctx.out.warn(&format!("{}: {}", failure.file_name, failure.message));
        }
        match report.status {
            PrintStatus::Cancelled => ctx.out.warn(&format!(
                "Cancelled after {} of {} document(s)",
                report.completed, report.total
            )),
            _ => ctx.out.success(&format!(
                "Processed {} document(s), {} failed",
                report.completed,
                report.failures.len()
            )),
        }
        Ok(())
    }

    async fn dispatch(&self, ctx: &Context, catalog: Vec<RemoteFile>) -> Result<PrintRunReport> {
        if self.all {
            let files = super::visible(catalog, self.filter.as_deref());
            return Ok(ctx.service.print_all(files).await?);
        }

        let mut files = super::resolve(&catalog, &self.files)?;
        if files.len() == 1 {
            Ok(ctx.service.print_one(files.remove(0)).await?)
        } else {
            Ok(ctx.service.print_selected(files).await?)
        }
    }
}

fn show_progress(ctx: &Context, event: &CoreEvent) {
    if ctx.format != OutputFormat::Human {
        return;
    }
    if let CoreEvent::Print(PrintEvent::Progress {
        completed, total, ..
    }) = event
    {
        ctx.out.info(&format!("[{}/{}]", completed, total));
    }
}
