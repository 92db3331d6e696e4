use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// Hands the picture to the desktop's default viewer without waiting for it.
pub fn open_in_viewer(path: &Path) -> Result<()> {
    let mut c = viewer_command(path)?;
    c.stdout(Stdio::null()).stderr(Stdio::null());
    c.spawn()
        .with_context(|| format!("failed to open {} in the image viewer", path.display()))?;
    tracing::debug!(path = %path.display(), "image sent to viewer");
    Ok(())
}

#[cfg(target_os = "windows")]
fn viewer_command(path: &Path) -> Result<Command> {
    let mut c = Command::new("cmd");
    c.arg("/C").arg("start").arg("").arg(path);
    Ok(c)
}

#[cfg(target_os = "macos")]
fn viewer_command(path: &Path) -> Result<Command> {
    let mut c = Command::new("open");
    c.arg(path);
    Ok(c)
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn viewer_command(path: &Path) -> Result<Command> {
    let program = ["xdg-open", "gio", "eog", "display"]
        .into_iter()
        .find_map(|p| which::which(p).ok())
        .ok_or_else(|| anyhow!("no image viewer found (tried xdg-open, gio, eog, display)"))?;
    let mut c = Command::new(&program);
    if program.file_name().is_some_and(|n| n == "gio") {
        c.arg("open");
    }
    c.arg(path);
    Ok(c)
}
