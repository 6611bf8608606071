pub mod auth;
pub mod delete;
pub mod list;
pub mod print;
pub mod settings;
pub mod status;
pub mod watch;

use anyhow::{bail, Result};
use core_service::{filter_by_name, RemoteFile};

/// Catalog entries whose name contains `filter`, or all of them.
pub(crate) fn visible(files: Vec<RemoteFile>, filter: Option<&str>) -> Vec<RemoteFile> {
    match filter {
        Some(query) => filter_by_name(&files, query).into_iter().cloned().collect(),
        None => files,
    }
}

/// Match each argument against file ids first, then exact names.
pub(crate) fn resolve(files: &[RemoteFile], wanted: &[String]) -> Result<Vec<RemoteFile>> {
    let mut selected = Vec::with_capacity(wanted.len());
    for target in wanted {
        let found = files
            .iter()
            .find(|f| f.id == *target)
            .or_else(|| files.iter().find(|f| f.name == *target));
        match found {
            Some(file) => selected.push(file.clone()),
            None => bail!("No document with id or name '{}' in the folder", target),
        }
    }
    Ok(selected)
}
