//! Socket, configuration and log paths
//!
//! Unix/macOS: per-run sockets live in $XDG_RUNTIME_DIR or /tmp
//! Windows: the socket path's file name becomes a named pipe

use std::io;
use std::path::{Path, PathBuf};

/// Name used for runtime, config and data directories
const APP_NAME: &str = "deletion-harness";

/// Directory holding per-run sockets
///
/// - Unix: `$XDG_RUNTIME_DIR/deletion-harness` or `/tmp/deletion-harness-<uid>`
/// - Windows: the temp dir (only the file name is used for the pipe)
#[cfg(unix)]
pub fn runtime_dir() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        if !runtime_dir.is_empty() {
            return PathBuf::from(runtime_dir).join(APP_NAME);
        }
    }

    // Fallback to /tmp with uid for security
    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/tmp/{}-{}", APP_NAME, uid))
}

#[cfg(windows)]
pub fn runtime_dir() -> PathBuf {
    std::env::temp_dir().join(APP_NAME)
}

/// Socket path unique to this harness process
pub fn run_socket_path() -> PathBuf {
    runtime_dir().join(format!("target-{}.sock", std::process::id()))
}

/// Ensure the directory holding `socket` exists
///
/// On Unix, a newly created directory gets mode 0700
#[cfg(unix)]
pub fn ensure_socket_dir(socket: &Path) -> io::Result<()> {
    let dir = socket
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Invalid socket path"))?;

    if !dir.as_os_str().is_empty() && !dir.exists() {
        std::fs::create_dir_all(dir)?;
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    }

    Ok(())
}

#[cfg(windows)]
pub fn ensure_socket_dir(_socket: &Path) -> io::Result<()> {
    // Named pipes don't need a directory on Windows
    Ok(())
}

/// Remove a socket file if it exists
#[cfg(unix)]
pub fn remove_socket(socket: &Path) -> io::Result<()> {
    match std::fs::remove_file(socket) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(windows)]
pub fn remove_socket(_socket: &Path) -> io::Result<()> {
    // Named pipes are automatically cleaned up on Windows
    Ok(())
}

/// Get the configuration directory path
///
/// - Linux: `~/.config/deletion-harness/`
/// - macOS: `~/Library/Application Support/deletion-harness/`
/// - Windows: `%APPDATA%\deletion-harness\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().join("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_socket_path_is_per_process() {
        let path = run_socket_path();
        assert!(path.starts_with(runtime_dir()));
        assert!(path
            .to_string_lossy()
            .contains(&std::process::id().to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_and_remove_socket() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("nested").join("t.sock");

        ensure_socket_dir(&socket).unwrap();
        assert!(socket.parent().unwrap().is_dir());

        std::fs::write(&socket, b"").unwrap();
        remove_socket(&socket).unwrap();
        assert!(!socket.exists());

        // Removing twice is fine
        remove_socket(&socket).unwrap();
    }
}
