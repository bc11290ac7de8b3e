/// Response actions on individual files flagged by a scan.
///
/// Quarantine moves a file into a quarantine directory; lock and unlock
/// toggle its write permission. Nothing here runs automatically: callers
/// apply these to `ScanStatus::threats` once a scan has finished.
use crate::error::ActionError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Highest numeric suffix tried when a quarantine name is already taken.
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Where a quarantined file came from and where it now lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuarantineRecord {
    pub original_path: PathBuf,
    pub quarantine_path: PathBuf,
    pub quarantined_at: DateTime<Utc>,
}

/// Move `path` into `quarantine_dir`, creating the directory (owner-only on
/// Unix) if needed.
///
/// The file keeps its name; if that name is taken in the quarantine
/// directory a numeric suffix is appended (`eicar.com.1`, `eicar.com.2`, ...)
/// so earlier captures are never overwritten. A rename is tried first and a
/// copy followed by removal of the original is used when the rename fails,
/// e.g. across filesystems.
pub fn quarantine_file(path: &Path, quarantine_dir: &Path) -> Result<QuarantineRecord, ActionError> {
    let move_err = |to: &Path, source: io::Error| ActionError::Move {
        from: path.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(ActionError::NotAFile(path.to_path_buf())),
        Err(source) => return Err(move_err(quarantine_dir, source)),
    }
    let name = path
        .file_name()
        .ok_or_else(|| ActionError::NotAFile(path.to_path_buf()))?;

    create_quarantine_dir(quarantine_dir).map_err(|source| ActionError::QuarantineDir {
        path: quarantine_dir.to_path_buf(),
        source,
    })?;

    let destination = free_destination(quarantine_dir, name).ok_or_else(|| {
        move_err(
            quarantine_dir,
            io::Error::new(io::ErrorKind::AlreadyExists, "no free quarantine name"),
        )
    })?;

    move_file(path, &destination).map_err(|source| move_err(&destination, source))?;
    info!("Quarantined {} -> {}", path.display(), destination.display());

    Ok(QuarantineRecord {
        original_path: path.to_path_buf(),
        quarantine_path: destination,
        quarantined_at: Utc::now(),
    })
}

/// Remove every write permission bit from `path`.
pub fn lock_file(path: &Path) -> Result<(), ActionError> {
    set_writable(path, false)?;
    info!("Locked {}", path.display());
    Ok(())
}

/// Restore owner write permission on `path`.
pub fn unlock_file(path: &Path) -> Result<(), ActionError> {
    set_writable(path, true)?;
    info!("Unlocked {}", path.display());
    Ok(())
}

/// Whether `path` currently has no write permission.
pub fn is_locked(path: &Path) -> io::Result<bool> {
    Ok(fs::metadata(path)?.permissions().readonly())
}

fn create_quarantine_dir(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}

fn free_destination(dir: &Path, name: &OsStr) -> Option<PathBuf> {
    let taken = |p: &Path| fs::symlink_metadata(p).is_ok();

    let plain = dir.join(name);
    if !taken(&plain) {
        return Some(plain);
    }
    (1..=MAX_NAME_ATTEMPTS)
        .map(|n| {
            let mut suffixed = name.to_os_string();
            suffixed.push(format!(".{n}"));
            dir.join(suffixed)
        })
        .find(|candidate| !taken(candidate))
}

fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) => {
            debug!("Rename of {} failed ({err}), copying instead", from.display());
            copy_then_remove(from, to)
        }
    }
}

/// Copy into a new file at `to`, then delete `from`. On any failure the
/// partial copy is removed and `from` is left in place.
fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    let mut src = fs::File::open(from)?;
    let mut dst = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(to)?;

    let copied = io::copy(&mut src, &mut dst).and_then(|_| dst.sync_all());
    drop(dst);
    if let Err(err) = copied {
        let _ = fs::remove_file(to);
        return Err(err);
    }

    drop(src);
    if let Err(err) = fs::remove_file(from) {
        let _ = fs::remove_file(to);
        return Err(err);
    }
    Ok(())
}

fn set_writable(path: &Path, writable: bool) -> Result<(), ActionError> {
    let perm_err = |source: io::Error| ActionError::Permissions {
        path: path.to_path_buf(),
        source,
    };

    let meta = fs::metadata(path).map_err(perm_err)?;
    if !meta.is_file() {
        return Err(ActionError::NotAFile(path.to_path_buf()));
    }

    let mut perms = meta.permissions();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = perms.mode();
        perms.set_mode(if writable { mode | 0o200 } else { mode & !0o222 });
    }
    #[cfg(not(unix))]
    perms.set_readonly(!writable);

    fs::set_permissions(path, perms).map_err(perm_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn quarantine_moves_file_and_creates_dir() {
        let tmp = TempDir::new().unwrap();
        let original = tmp.path().join("dropper.exe");
        fs::write(&original, b"MZ payload").unwrap();
        let qdir = tmp.path().join("q").join("nested");

        let record = quarantine_file(&original, &qdir).unwrap();

        assert!(!original.exists());
        assert_eq!(record.original_path, original);
        assert_eq!(record.quarantine_path, qdir.join("dropper.exe"));
        assert_eq!(fs::read(&record.quarantine_path).unwrap(), b"MZ payload");
    }

    #[test]
    fn quarantine_name_collision_gets_suffix() {
        let tmp = TempDir::new().unwrap();
        let qdir = tmp.path().join("q");
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join("eicar.com"), b"first").unwrap();
        fs::write(b.join("eicar.com"), b"second").unwrap();

        let first = quarantine_file(&a.join("eicar.com"), &qdir).unwrap();
        let second = quarantine_file(&b.join("eicar.com"), &qdir).unwrap();

        assert_eq!(first.quarantine_path, qdir.join("eicar.com"));
        assert_eq!(second.quarantine_path, qdir.join("eicar.com.1"));
        assert_eq!(fs::read(&first.quarantine_path).unwrap(), b"first");
        assert_eq!(fs::read(&second.quarantine_path).unwrap(), b"second");
    }

    #[test]
    fn quarantine_missing_file_is_move_error() {
        let tmp = TempDir::new().unwrap();
        let err = quarantine_file(&tmp.path().join("gone.exe"), &tmp.path().join("q")).unwrap_err();
        assert!(matches!(err, ActionError::Move { .. }));
        assert!(!tmp.path().join("q").exists(), "no directory for a failed quarantine");
    }

    #[test]
    fn quarantine_rejects_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("folder.exe");
        fs::create_dir_all(&dir).unwrap();
        assert!(matches!(
            quarantine_file(&dir, &tmp.path().join("q")),
            Err(ActionError::NotAFile(_))
        ));
        assert!(dir.is_dir());
    }

    #[test]
    fn copy_fallback_moves_content() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("src.bin");
        let to = tmp.path().join("dst.bin");
        fs::write(&from, vec![7u8; 200_000]).unwrap();

        copy_then_remove(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), vec![7u8; 200_000]);
    }

    #[test]
    fn copy_fallback_never_clobbers() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("src.bin");
        let to = tmp.path().join("dst.bin");
        fs::write(&from, b"new").unwrap();
        fs::write(&to, b"old").unwrap();

        assert!(copy_then_remove(&from, &to).is_err());
        assert_eq!(fs::read(&from).unwrap(), b"new");
        assert_eq!(fs::read(&to).unwrap(), b"old");
    }

    #[test]
    fn lock_and_unlock_toggle_write_permission() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tool.ps1");
        fs::write(&path, b"Write-Host hi").unwrap();
        assert!(!is_locked(&path).unwrap());

        lock_file(&path).unwrap();
        assert!(is_locked(&path).unwrap());

        unlock_file(&path).unwrap();
        assert!(!is_locked(&path).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn lock_clears_every_write_bit_and_unlock_restores_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("run.sh.bat");
        fs::write(&path, b"echo").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o664)).unwrap();

        lock_file(&path).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o444);

        unlock_file(&path).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn quarantine_dir_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let original = tmp.path().join("x.js");
        fs::write(&original, b"alert(1)").unwrap();
        let qdir = tmp.path().join("quarantine");

        quarantine_file(&original, &qdir).unwrap();
        assert_eq!(fs::metadata(&qdir).unwrap().permissions().mode() & 0o777, 0o700);
    }

    #[test]
    fn lock_missing_file_is_permissions_error() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            lock_file(&tmp.path().join("absent.exe")),
            Err(ActionError::Permissions { .. })
        ));
    }
}
