//! Shared path resolution for the file tools: joins a tool-supplied relative path
//! onto the working folder and rejects anything that escapes it.

use std::path::{Path, PathBuf};

use crate::error::ToolSourceError;

/// Resolves `path_param` (as supplied by the model) relative to `working_folder`,
/// rejecting absolute paths and `..` escapes. Does not require the target to exist:
/// write tools need to resolve paths that will be created.
pub fn resolve_path_under(working_folder: &Path, path_param: &str) -> Result<PathBuf, ToolSourceError> {
    let candidate = Path::new(path_param);
    if candidate.is_absolute() {
        return Err(ToolSourceError::InvalidInput(format!(
            "path must be relative to the working folder: {path_param}"
        )));
    }

    let mut resolved = working_folder.to_path_buf();
    for component in candidate.components() {
        use std::path::Component;
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() || !resolved.starts_with(working_folder) {
                    return Err(ToolSourceError::InvalidInput(format!(
                        "path escapes working folder: {path_param}"
                    )));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ToolSourceError::InvalidInput(format!(
                    "path must be relative to the working folder: {path_param}"
                )));
            }
        }
    }

    if !resolved.starts_with(working_folder) {
        return Err(ToolSourceError::InvalidInput(format!(
            "path escapes working folder: {path_param}"
        )));
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_relative_path_onto_working_folder() {
        let root = PathBuf::from("/work");
        let resolved = resolve_path_under(&root, "src/main.rs").unwrap();
        assert_eq!(resolved, PathBuf::from("/work/src/main.rs"));
    }

    #[test]
    fn rejects_absolute_path() {
        let root = PathBuf::from("/work");
        assert!(resolve_path_under(&root, "/etc/passwd").is_err());
    }

    #[test]
    fn rejects_parent_dir_escape() {
        let root = PathBuf::from("/work");
        assert!(resolve_path_under(&root, "../outside").is_err());
        assert!(resolve_path_under(&root, "a/../../outside").is_err());
    }

    #[test]
    fn allows_parent_dir_that_stays_inside_root() {
        let root = PathBuf::from("/work");
        let resolved = resolve_path_under(&root, "a/../b").unwrap();
        assert_eq!(resolved, PathBuf::from("/work/b"));
    }
}
