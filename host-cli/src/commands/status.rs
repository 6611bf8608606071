use anyhow::Result;
use clap::Args;
use core_service::ConnectionStatus;

use crate::output::OutputFormat;
use crate::Context;

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let status = ctx.service.test_connection().await;

        if ctx.format == OutputFormat::Json {
            ctx.out.print_json(&serde_json::json!({
                "folderId": ctx.service.folder_id(),
                "connection": status,
            }));
            return Ok(());
        }

        ctx.out.info(&format!("Folder: {}", ctx.service.folder_id()));
        match status {
            ConnectionStatus::Connected => ctx.out.success("Connected"),
            ConnectionStatus::Disconnected => ctx.out.error("Disconnected"),
            ConnectionStatus::Error(message) => ctx.out.error(&message),
        }
        Ok(())
    }
}
