//! Artifact export
//!
//! Writes the extraction result under an exclusive lock. When run through
//! sudo the directory (if created here) and the file are handed to the
//! invoking user so the artifact is not left owned by root.

use anyhow::{Context, Result};
use fwmig_rules::ExtractionResult;
use nix::fcntl::{Flock, FlockArg};
use nix::unistd::{chown, getgid, getuid, Gid, Uid, User};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The user the artifact should belong to
#[derive(Debug, Clone)]
pub struct Owner {
    pub name: String,
    pub uid: Uid,
    pub gid: Gid,
    pub home: PathBuf,
    /// Running under sudo; ownership is only adjusted in this case
    pub elevated: bool,
}

impl Owner {
    /// The sudo caller when `SUDO_USER` names a known user, else the current user
    pub fn detect() -> Self {
        if let Ok(sudo_user) = std::env::var("SUDO_USER") {
            match User::from_name(&sudo_user) {
                Ok(Some(user)) => {
                    return Self {
                        name: user.name,
                        uid: user.uid,
                        gid: user.gid,
                        home: user.dir,
                        elevated: true,
                    }
                }
                Ok(None) => warn!("SUDO_USER '{sudo_user}' is not a known user, keeping current owner"),
                Err(e) => warn!("Could not look up SUDO_USER '{sudo_user}': {e}"),
            }
        }
        Self::current()
    }

    pub fn current() -> Self {
        let uid = getuid();
        Self {
            name: std::env::var("USER").unwrap_or_else(|_| uid.to_string()),
            uid,
            gid: getgid(),
            home: std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/")),
            elevated: false,
        }
    }

    /// Expand a leading `~` to this user's home directory
    pub fn expand_home(&self, dir: &str) -> PathBuf {
        match dir.strip_prefix('~') {
            Some("") => self.home.clone(),
            Some(rest) if rest.starts_with('/') => self.home.join(&rest[1..]),
            _ => PathBuf::from(dir),
        }
    }

    // best effort, only under sudo
    fn adopt(&self, path: &Path) {
        if !self.elevated {
            return;
        }
        match chown(path, Some(self.uid), Some(self.gid)) {
            Ok(()) => debug!("Ownership of {} set to {}", path.display(), self.name),
            Err(e) => warn!("Could not chown {} to {}: {e}", path.display(), self.name),
        }
    }
}

/// Write `result` as pretty JSON to `<output_dir>/<file_name>`.
pub fn export(
    result: &ExtractionResult,
    output_dir: &Path,
    file_name: &str,
    owner: &Owner,
) -> Result<PathBuf> {
    if !output_dir.exists() {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create directory {}", output_dir.display()))?;
        info!("Created directory: {}", output_dir.display());
        owner.adopt(output_dir);
    }

    let path = output_dir.join(file_name);
    write_locked(&path, result)?;
    owner.adopt(&path);

    Ok(path)
}

fn write_locked(path: &Path, result: &ExtractionResult) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    // Truncate only once the lock is held; the lock is released on drop.
    let mut file = Flock::lock(file, FlockArg::LockExclusive)
        .map_err(|(_, errno)| errno)
        .with_context(|| format!("Failed to lock {}", path.display()))?;

    file.set_len(0)
        .with_context(|| format!("Failed to truncate {}", path.display()))?;
    serde_json::to_writer_pretty(&mut *file, result)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.write_all(b"\n")?;
    file.sync_all()
        .with_context(|| format!("Failed to sync {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExtractionResult {
        ExtractionResult::extract(
            vec!["ssh".into(), "http".into()],
            vec!["9999/udp".into()],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_export_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = export(&sample(), dir.path(), "firewall_rules.json", &Owner::current()).unwrap();

        assert_eq!(path, dir.path().join("firewall_rules.json"));
        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: ExtractionResult = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, sample());
        assert!(content.contains("\n  \"services\""));
    }

    #[test]
    fn test_export_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        let path = export(&sample(), &nested, "rules.json", &Owner::current()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_export_replaces_longer_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("rules.json");
        std::fs::write(&target, "x".repeat(64 * 1024)).unwrap();

        export(&sample(), dir.path(), "rules.json", &Owner::current()).unwrap();
        let content = std::fs::read_to_string(&target).unwrap();
        assert!(serde_json::from_str::<ExtractionResult>(&content).is_ok());
    }

    #[test]
    fn test_elevated_owner_chowns_to_self() {
        let dir = tempfile::tempdir().unwrap();
        let owner = Owner {
            elevated: true,
            ..Owner::current()
        };
        let path = export(&sample(), &dir.path().join("out"), "rules.json", &owner).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_expand_home() {
        let owner = Owner {
            home: PathBuf::from("/home/operator"),
            ..Owner::current()
        };
        assert_eq!(owner.expand_home("~"), PathBuf::from("/home/operator"));
        assert_eq!(owner.expand_home("~/fw-migration"), PathBuf::from("/home/operator/fw-migration"));
        assert_eq!(owner.expand_home("/srv/out"), PathBuf::from("/srv/out"));
        assert_eq!(owner.expand_home("~other/x"), PathBuf::from("~other/x"));
    }
}
