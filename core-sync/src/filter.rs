//! Name filtering for the visible file list.

use bridge_traits::remote::RemoteFile;

/// Files whose name contains `query`, ignoring case, in their original order.
///
/// A blank query matches everything.
pub fn filter_by_name<'a>(files: &'a [RemoteFile], query: &str) -> Vec<&'a RemoteFile> {
    let needle = query.trim().to_lowercase();
    files
        .iter()
        .filter(|f| needle.is_empty() || f.name.to_lowercase().contains(&needle))
        .collect()
}
