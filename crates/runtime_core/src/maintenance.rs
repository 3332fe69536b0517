use std::path::{Path, PathBuf};

use platform::Fs;

/// Marker file whose presence puts the application into maintenance mode.
pub fn maintenance_path(ephemeral: bool, default_root: &Path, scratch_root: &Path) -> PathBuf {
    let root = if ephemeral { scratch_root } else { default_root };
    root.join("framework").join("maintenance.php")
}

pub fn in_maintenance(fs: &dyn Fs, marker: &Path) -> bool {
    fs.exists(marker)
}
