use std::path::Path;
use std::process::Command;

use tracing::{info, warn};

/// Hands the artifact to the desktop's default application.
pub fn open_for_review(path: &Path) {
    let mut command = if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]).arg(path);
        command
    } else if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg(path);
        command
    } else {
        let mut command = Command::new("xdg-open");
        command.arg(path);
        command
    };
    match command.spawn() {
        Ok(_) => info!(path = %path.display(), "Opened results for review"),
        Err(err) => warn!(path = %path.display(), error = %err, "Could not open results"),
    }
}
