use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use crate::error::{GalleryError, Result};

/// External image viewer, opened on a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageViewer {
    program: String,
    args: Vec<String>,
}

impl ImageViewer {
    /// Build from the tokens of the configured command line
    pub fn from_tokens(tokens: Vec<String>) -> Result<Self> {
        let mut tokens = tokens.into_iter();
        let program = tokens.next().ok_or(GalleryError::EmptyViewerCommand)?;

        Ok(ImageViewer {
            program,
            args: tokens.collect(),
        })
    }

    /// Configured command with `dir` appended as the last argument
    pub fn command(&self, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }

    /// Spawn the viewer without waiting for it
    pub fn launch(&self, dir: &Path) -> Result<()> {
        self.spawn_reaped(dir).map(|_| ())
    }

    /// Spawn the viewer and wait for it on a background thread, so an exited
    /// viewer doesn't linger as a zombie
    fn spawn_reaped(&self, dir: &Path) -> Result<JoinHandle<Option<ExitStatus>>> {
        let mut child = self.command(dir).spawn().map_err(|e| GalleryError::Spawn {
            program: self.program.clone(),
            source: e,
        })?;

        log::info!("Launched {} (pid {}) on {}", self.program, child.id(), dir.display());

        let program = self.program.clone();
        Ok(thread::spawn(move || match child.wait() {
            Ok(status) => {
                log::debug!("{} (pid {}) exited: {}", program, child.id(), status);
                Some(status)
            }
            Err(e) => {
                log::warn!("Cannot wait for {} (pid {}): {}", program, child.id(), e);
                None
            }
        }))
    }
}
