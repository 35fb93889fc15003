//! Recursive directory copy used by data directory backups.

use crate::error::AppError;
use std::fs;
use std::path::Path;

pub(crate) fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), AppError> {
    let storage_err = |what: String| move |err: std::io::Error| {
        AppError::StorageMessage(format!("{}: {}", what, err))
    };

    fs::create_dir_all(dst).map_err(storage_err(format!("Failed to create {:?}", dst)))?;
    let entries =
        fs::read_dir(src).map_err(storage_err(format!("Failed to read directory {:?}", src)))?;

    for entry in entries {
        let entry = entry.map_err(storage_err(format!("Failed to list {:?}", src)))?;
        let path = entry.path();
        let target = dst.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(storage_err(format!("Failed to stat {:?}", path)))?;

        if file_type.is_dir() {
            copy_dir_recursive(&path, &target)?;
        } else if file_type.is_file() {
            fs::copy(&path, &target).map_err(storage_err(format!("Failed to copy {:?}", path)))?;
        }
    }

    Ok(())
}
