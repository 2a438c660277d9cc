//! Launch an external DOT viewer on a rendered graph.

use std::path::Path;
use std::process::{Child, Command};

use crate::error::{MubinGraphError, Result};

/// Split a configured viewer command ("dot -Tx11") into program and leading args.
pub fn viewer_command(command: &str, file: &Path) -> Result<Command> {
    let mut words = command.split_whitespace();
    let program = words
        .next()
        .ok_or_else(|| MubinGraphError::Config("render.viewer is empty".to_string()))?;
    let mut cmd = Command::new(program);
    cmd.args(words).arg(file);
    Ok(cmd)
}

/// Spawn the viewer without waiting for it to exit.
pub fn open_in_viewer(command: &str, file: &Path) -> Result<Child> {
    let mut cmd = viewer_command(command, file)?;
    log::info!("Opening {} with {}", file.display(), command);
    Ok(cmd.spawn()?)
}
