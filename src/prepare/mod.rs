//! Environment preparer
//!
//! Makes sure the target's source is checked out and its dependencies are
//! installed before anything is launched. Every step is skipped when its
//! result is already on disk, so repeated runs are cheap.

mod step;

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::common::config::RepoConfig;
use crate::common::{Error, Result};

pub use step::run_step;

/// What preparation did
#[derive(Debug)]
pub struct Prepared {
    /// Directory the target runs in
    pub workdir: PathBuf,
    /// Whether the source was cloned during this run
    pub acquired: bool,
    /// Whether the install command ran during this run
    pub installed: bool,
}

/// Acquire source and install dependencies per `repo`
pub async fn prepare(repo: &RepoConfig) -> Result<Prepared> {
    let workdir = repo.resolved_workdir();

    let Some(location) = repo.location.as_deref() else {
        tracing::info!(workdir = %workdir.display(), "No repository configured, skipping preparation");
        return Ok(Prepared {
            workdir,
            acquired: false,
            installed: false,
        });
    };

    repo.validate()?;
    println!("\n{}", "Preparing environment:".cyan());

    let acquired = acquire(location, &workdir).await?;
    let pruned = prune(&workdir, &repo.prune)?;
    let installed = install(repo, &workdir, pruned > 0).await?;

    Ok(Prepared {
        workdir,
        acquired,
        installed,
    })
}

/// True when `workdir` exists and has at least one entry
pub fn has_source(workdir: &Path) -> bool {
    std::fs::read_dir(workdir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

async fn acquire(location: &str, workdir: &Path) -> Result<bool> {
    if has_source(workdir) {
        println!(
            "  {} Source present in {}, skipping clone",
            "✓".green(),
            workdir.display().to_string().dimmed()
        );
        return Ok(false);
    }

    if workdir.exists() && !workdir.is_dir() {
        return Err(Error::Acquisition(format!(
            "'{}' exists and is not a directory",
            workdir.display()
        )));
    }

    if let Some(parent) = workdir.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::Acquisition(format!("cannot create '{}': {}", parent.display(), e))
        })?;
    }

    let argv = vec![
        "git".to_string(),
        "clone".to_string(),
        location.to_string(),
        workdir.to_string_lossy().into_owned(),
    ];
    run_step(&argv, None).await?;

    println!("  {} Cloned {}", "✓".green(), location.dimmed());
    Ok(true)
}

/// Remove stale paths inside the workdir; returns how many were removed
fn prune(workdir: &Path, paths: &[PathBuf]) -> Result<usize> {
    let mut removed = 0;
    for relative in paths {
        let path = workdir.join(relative);
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else if path.exists() {
            std::fs::remove_file(&path)
        } else {
            continue;
        };
        result.map_err(|e| {
            Error::Acquisition(format!("cannot remove '{}': {}", path.display(), e))
        })?;

        println!("  {} Removed {}", "✓".green(), relative.display());
        removed += 1;
    }
    Ok(removed)
}

async fn install(repo: &RepoConfig, workdir: &Path, force: bool) -> Result<bool> {
    if repo.install_command.is_empty() {
        tracing::debug!("No install command configured");
        return Ok(false);
    }

    if !force && !repo.force_install {
        let marker = repo
            .install_marker
            .as_ref()
            .filter(|m| !m.as_os_str().is_empty());
        if let Some(marker) = marker {
            if workdir.join(marker).exists() {
                println!(
                    "  {} Dependencies present ({}), skipping install",
                    "✓".green(),
                    marker.display()
                );
                return Ok(false);
            }
        }
    }

    run_step(&repo.install_command, Some(workdir)).await?;
    println!("  {} Dependencies installed", "✓".green());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;

    fn repo_in(workdir: &Path, location: &str) -> RepoConfig {
        RepoConfig {
            location: Some(location.to_string()),
            workdir: Some(workdir.to_path_buf()),
            install_command: Vec::new(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_no_location_skips_everything() {
        let prepared = prepare(&RepoConfig::default()).await.unwrap();
        assert!(!prepared.acquired);
        assert!(!prepared.installed);
        assert_eq!(prepared.workdir, PathBuf::from("."));
    }

    #[tokio::test]
    async fn test_existing_source_skips_clone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();

        // The location is never touched when the source is already there
        let repo = repo_in(dir.path(), "https://invalid.example/never-fetched.git");
        let prepared = prepare(&repo).await.unwrap();
        assert!(!prepared.acquired);
    }

    #[test]
    fn test_has_source() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!has_source(&dir.path().join("missing")));
        assert!(!has_source(dir.path()));
        std::fs::write(dir.path().join("x"), "").unwrap();
        assert!(has_source(dir.path()));
    }

    #[tokio::test]
    async fn test_clone_failure_is_acquisition_error() {
        if which::which("git").is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path().join("checkout");
        let missing = dir.path().join("no-such-repo");

        let repo = repo_in(&workdir, &missing.to_string_lossy());
        let err = prepare(&repo).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Acquisition);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clone_local_repository() {
        if which::which("git").is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let origin = dir.path().join("origin");
        std::fs::create_dir_all(&origin).unwrap();
        let init = vec!["git".to_string(), "init".to_string(), "-q".to_string()];
        run_step(&init, Some(&origin)).await.unwrap();

        let workdir = dir.path().join("nested").join("checkout");
        let repo = repo_in(&workdir, &origin.to_string_lossy());

        let first = prepare(&repo).await.unwrap();
        assert!(first.acquired);
        assert!(has_source(&workdir));

        let second = prepare(&repo).await.unwrap();
        assert!(!second.acquired);
    }

    #[test]
    fn test_prune_removes_dirs_and_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/electron/dist")).unwrap();
        std::fs::write(dir.path().join("stale.lock"), "").unwrap();

        let removed = prune(
            dir.path(),
            &[
                PathBuf::from("node_modules/electron"),
                PathBuf::from("stale.lock"),
                PathBuf::from("not-there"),
            ],
        )
        .unwrap();

        assert_eq!(removed, 2);
        assert!(dir.path().join("node_modules").exists());
        assert!(!dir.path().join("node_modules/electron").exists());
        assert!(!dir.path().join("stale.lock").exists());
    }

    #[tokio::test]
    async fn test_escaping_prune_path_rejected_before_clone() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepoConfig {
            location: Some(dir.path().join("no-such-repo").display().to_string()),
            workdir: Some(dir.path().join("checkout")),
            prune: vec![PathBuf::from("../outside")],
            ..Default::default()
        };

        let err = prepare(&repo).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!dir.path().join("checkout").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_install_skipped_when_marker_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("node_modules")).unwrap();

        let repo = RepoConfig {
            install_command: vec!["sh".into(), "-c".into(), "touch ran".into()],
            ..Default::default()
        };
        assert!(!install(&repo, dir.path(), false).await.unwrap());
        assert!(!dir.path().join("ran").exists());

        // A prune or --force-install runs it anyway
        assert!(install(&repo, dir.path(), true).await.unwrap());
        assert!(dir.path().join("ran").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_install_is_acquisition_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepoConfig {
            install_command: vec!["sh".into(), "-c".into(), "exit 1".into()],
            ..Default::default()
        };
        let err = install(&repo, dir.path(), false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Acquisition);
    }
}
