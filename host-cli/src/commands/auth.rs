use anyhow::{Context as _, Result};
use clap::Subcommand;

use crate::Context;

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Forget the stored credential and sign in again in the browser
    Login,
    /// Forget the stored credential
    Logout,
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        match self {
            AuthCommand::Login => {
                ctx.service
                    .reauthorize()
                    .await
                    .context("Sign-in did not complete")?;
                ctx.out.success("Signed in");
            }
            AuthCommand::Logout => {
                ctx.service.sign_out().await.context("Failed to sign out")?;
                ctx.out.success("Signed out");
            }
        }
        Ok(())
    }
}
