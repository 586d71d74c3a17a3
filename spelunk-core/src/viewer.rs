use crate::map::ExportError;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Something that can put a rendered diagram in front of the user.
pub trait DiagramViewer {
    fn show(&self, path: &Path) -> Result<(), ExportError>;
}

/// Hands the file to the desktop's default opener.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemViewer;

impl SystemViewer {
    fn command(path: &Path) -> Command {
        if cfg!(target_os = "macos") {
            let mut cmd = Command::new("open");
            cmd.arg(path);
            cmd
        } else if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", ""]).arg(path);
            cmd
        } else {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(path);
            cmd
        }
    }
}

impl DiagramViewer for SystemViewer {
    fn show(&self, path: &Path) -> Result<(), ExportError> {
        let mut cmd = Self::command(path);
        debug!("Opening diagram with {:?}", cmd);

        let status = cmd
            .status()
            .map_err(|e| ExportError::Viewer(format!("failed to launch viewer: {}", e)))?;
        if !status.success() {
            return Err(ExportError::Viewer(format!(
                "viewer exited with {} for {}",
                status,
                path.display()
            )));
        }
        Ok(())
    }
}
