//! Print Executor backed by an external command line PDF tool
//!
//! Silent printing shells out to a SumatraPDF-compatible program
//! (`-print-to-default`/`-print-to`, `-silent`, `-print-settings`). Preview
//! opens the document in the system default viewer instead.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    print::{DuplexMode, PageOrientation, PrintExecutor, PrintOptions},
};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Desktop [`PrintExecutor`].
pub struct CommandPrintExecutor {
    program: PathBuf,
}

impl CommandPrintExecutor {
    /// Use `program` for silent printing.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Command line arguments for a silent print of `path`.
    pub fn print_args(path: &Path, options: &PrintOptions) -> Vec<String> {
        let mut args = Vec::new();

        match &options.printer {
            Some(printer) => {
                args.push("-print-to".to_string());
                args.push(printer.clone());
            }
            None => args.push("-print-to-default".to_string()),
        }
        args.push("-silent".to_string());

        let mut settings = vec![if options.fit { "fit" } else { "noscale" }.to_string()];
        match options.orientation {
            Some(PageOrientation::Portrait) => settings.push("portrait".to_string()),
            Some(PageOrientation::Landscape) => settings.push("landscape".to_string()),
            None => {}
        }
        if let Some(paper) = &options.paper_size {
            settings.push(format!("paper={}", paper));
        }
        if let Some(copies) = options.copies {
            settings.push(format!("{}x", copies));
        }
        match options.duplex {
            Some(DuplexMode::Simplex) => settings.push("simplex".to_string()),
            Some(DuplexMode::Short) => settings.push("duplexshort".to_string()),
            Some(DuplexMode::Long) => settings.push("duplexlong".to_string()),
            None => {}
        }

        args.push("-print-settings".to_string());
        args.push(settings.join(","));
        args.push(path.display().to_string());
        args
    }

    /// Command that opens `path` in the platform default viewer.
    fn viewer_command(path: &Path) -> Command {
        if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg("start").arg("").arg(path);
            cmd
        } else if cfg!(target_os = "macos") {
            let mut cmd = Command::new("open");
            cmd.arg(path);
            cmd
        } else {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(path);
            cmd
        }
    }

    async fn run(mut command: Command, what: &str) -> Result<()> {
        let status = command.status().await.map_err(|e| {
            BridgeError::NotAvailable(format!("Failed to launch {}: {}", what, e))
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(BridgeError::OperationFailed(format!(
                "{} exited with {}",
                what, status
            )))
        }
    }
}

#[async_trait]
impl PrintExecutor for CommandPrintExecutor {
    #[instrument(skip(self, options), fields(path = %path.display(), preview = options.show_dialog))]
    async fn print(&self, path: &Path, options: &PrintOptions) -> Result<()> {
        if options.show_dialog {
            info!("Opening document for preview");
            return Self::run(Self::viewer_command(path), "document viewer").await;
        }

        let args = Self::print_args(path, options);
        debug!(program = %self.program.display(), ?args, "Printing silently");

        let mut command = Command::new(&self.program);
        command.args(&args);
        Self::run(command, "print command").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_printer_args() {
        let options = PrintOptions {
            fit: true,
            ..PrintOptions::default()
        };
        let args = CommandPrintExecutor::print_args(Path::new("/tmp/A.pdf"), &options);

        assert_eq!(
            args,
            vec![
                "-print-to-default",
                "-silent",
                "-print-settings",
                "fit",
                "/tmp/A.pdf"
            ]
        );
    }

    #[test]
    fn test_all_options_are_mapped() {
        let options = PrintOptions {
            show_dialog: false,
            fit: false,
            orientation: Some(PageOrientation::Landscape),
            paper_size: Some("A4".to_string()),
            printer: Some("Office Laser".to_string()),
            copies: Some(2),
            duplex: Some(DuplexMode::Long),
        };
        let args = CommandPrintExecutor::print_args(Path::new("/tmp/B.pdf"), &options);

        assert_eq!(args[0], "-print-to");
        assert_eq!(args[1], "Office Laser");
        assert_eq!(args[2], "-silent");
        assert_eq!(args[3], "-print-settings");
        assert_eq!(args[4], "noscale,landscape,paper=A4,2x,duplexlong");
        assert_eq!(args[5], "/tmp/B.pdf");
    }

    #[tokio::test]
    async fn test_missing_program_is_reported() {
        let executor = CommandPrintExecutor::new("/nonexistent/drive-print-printer");
        let err = executor
            .print(Path::new("/tmp/none.pdf"), &PrintOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::NotAvailable(_)));
    }

    #[tokio::test]
    async fn test_list_printers_is_empty() {
        let executor = CommandPrintExecutor::new("SumatraPDF");
        assert!(executor.list_printers().await.unwrap().is_empty());
    }
}
