//! Destination path planning
//!
//! Pure arithmetic: given the source root, the destination root and one
//! local entry, compute the remote directory components to resolve and
//! the name the entry keeps remotely. No I/O, no failure modes beyond
//! paths that cannot be expressed against the configured roots.

use std::path::{Component, Path};

use icmirror_core::{LocalEntry, PlanError};

/// Where one local entry lands in the remote tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationPlan {
    /// Remote directory components to resolve, root-first; includes the
    /// destination root's own components
    pub dir_components: Vec<String>,
    /// Base name the entry keeps remotely (meaningful for files;
    /// directories are fully represented by the last component)
    pub file_name: String,
}

/// Plans the remote location for `entry`
///
/// `dir_components` is the destination root split on `/` followed by
/// the components of the entry's parent directory relative to
/// `source_root` - or of the entry itself when it is a directory.
///
/// # Errors
///
/// [`PlanError::OutsideSourceRoot`] when `entry` does not live under
/// `source_root`; [`PlanError::InvalidComponent`] when a component is
/// not representable as a remote name (non-UTF-8, or a path traversal
/// component).
pub fn plan(
    source_root: &Path,
    dest_root: &str,
    entry: &LocalEntry,
) -> Result<DestinationPlan, PlanError> {
    let relative = entry
        .path()
        .strip_prefix(source_root)
        .map_err(|_| PlanError::OutsideSourceRoot(entry.path().display().to_string()))?;

    let dir_relative = if entry.is_dir() {
        relative
    } else {
        relative.parent().unwrap_or_else(|| Path::new(""))
    };

    let mut dir_components: Vec<String> = dest_root
        .split('/')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();

    for component in dir_relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| PlanError::InvalidComponent(entry.path().display().to_string()))?;
                dir_components.push(part.to_string());
            }
            // A relative path under the source root never contains
            // roots or parent hops; seeing one means the caller handed
            // us something it should not have.
            _ => {
                return Err(PlanError::InvalidComponent(
                    entry.path().display().to_string(),
                ))
            }
        }
    }

    let file_name = entry
        .file_name()
        .ok_or_else(|| PlanError::InvalidComponent(entry.path().display().to_string()))?
        .to_string();

    Ok(DestinationPlan {
        dir_components,
        file_name,
    })
}
