use anyhow::Result;
use clap::Args;
use core_runtime::events::{CatalogEvent, RemoteEvent};
use core_service::CoreEvent;

use crate::output::OutputFormat;
use crate::Context;

#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Only count documents whose name contains this text
    #[arg(long, short)]
    pub filter: Option<String>,
}

impl WatchCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let mut events = ctx.service.subscribe().filter(|event| {
            matches!(event, CoreEvent::Catalog(_) | CoreEvent::Remote(_))
        });
        let poller = ctx.service.start_polling();
        ctx.out.info("Watching the folder, press Ctrl-C to stop");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                Ok(event) = events.recv() => self.show(ctx, event),
            }
        }

        ctx.service.shutdown();
        poller.await?;
        Ok(())
    }

    fn show(&self, ctx: &Context, event: CoreEvent) {
        if ctx.format == OutputFormat::Json {
            if let Ok(value) = serde_json::to_value(&event) {
                ctx.out.print_json(&value);
            }
            return;
        }

        match event {
            CoreEvent::Catalog(CatalogEvent::FileListUpdated { files }) => {
                let files = super::visible(files, self.filter.as_deref());
                ctx.out.info(&format!("{} document(s) in the folder", files.len()));
            }
            CoreEvent::Catalog(CatalogEvent::RefreshFailed { message }) => {
                ctx.out.warn(&format!("Refresh failed: {}", message));
            }
            CoreEvent::Remote(RemoteEvent::FileDeleted { file_id }) => {
                ctx.out.info(&format!("Deleted {}", file_id));
            }
            _ => {}
        }
    }
}
