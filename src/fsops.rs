//! Filesystem helpers shared by the builtins.

use chrono::{DateTime, Local};
use std::fmt;
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;

/// Mode used for every directory the shell creates.
pub const DIR_MODE: u32 = 0o755;

/// Create a single directory with [`DIR_MODE`]. Missing parents are an error.
pub fn create_dir(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(path)
}

fn create_dir_all(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(path)
}

/// Copy `src` to `dest`, descending depth-first into directories.
///
/// Destination directories are created as needed and existing files are
/// overwritten. Copying a file onto itself leaves it untouched. The first
/// failure aborts the walk; whatever was copied before it stays on disk.
pub fn copy_recursive(src: &Path, dest: &Path) -> io::Result<()> {
    if fs::metadata(src)?.is_dir() {
        if dest.starts_with(src) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot copy directory {} into itself", src.display()),
            ));
        }
        copy_dir(src, dest)
    } else {
        copy_file(src, dest)
    }
}

// `fs::copy` truncates the destination before reading the source.
fn copy_file(src: &Path, dest: &Path) -> io::Result<()> {
    if same_file(src, dest) {
        return Ok(());
    }
    fs::copy(src, dest).map(|_| ())
}

#[cfg(unix)]
fn same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn copy_dir(src: &Path, dest: &Path) -> io::Result<()> {
    create_dir_all(dest)?;
    let mut entries = fs::read_dir(src)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let from = entry.path();
        let to = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&from, &to)?;
        } else {
            copy_file(&from, &to)?;
        }
    }
    Ok(())
}

/// Render permission bits the way `ls -l` does, e.g. `drwxr-xr-x`.
pub fn mode_string(meta: &Metadata) -> String {
    let mut out = String::with_capacity(10);
    out.push(if meta.is_dir() { 'd' } else { '-' });
    let bits = permission_bits(meta);
    for shift in [6, 3, 0] {
        let triplet = (bits >> shift) & 0o7;
        out.push(if triplet & 0o4 != 0 { 'r' } else { '-' });
        out.push(if triplet & 0o2 != 0 { 'w' } else { '-' });
        out.push(if triplet & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[cfg(unix)]
pub fn permission_bits(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
pub fn permission_bits(meta: &Metadata) -> u32 {
    match (meta.permissions().readonly(), meta.is_dir()) {
        (true, true) => 0o555,
        (true, false) => 0o444,
        (false, true) => 0o755,
        (false, false) => 0o644,
    }
}

/// Apply raw permission bits to `path`.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

/// Only the owner write bit can be expressed here; it maps onto read-only.
#[cfg(not(unix))]
pub fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(path, perms)
}

/// Snapshot of the metadata `stat` prints.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub name: String,
    pub size: u64,
    pub mode: String,
    pub is_dir: bool,
    pub modified: DateTime<Local>,
}

impl FileReport {
    /// Read metadata for `path`, following symlinks.
    pub fn read(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            size: meta.len(),
            mode: mode_string(&meta),
            is_dir: meta.is_dir(),
            modified: meta.modified()?.into(),
        })
    }
}

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Size: {} bytes", self.size)?;
        writeln!(f, "Permissions: {}", self.mode)?;
        writeln!(f, "Is Directory: {}", self.is_dir)?;
        write!(
            f,
            "Last Modified: {}",
            self.modified.format("%Y-%m-%d %H:%M:%S%.9f %:z")
        )
    }
}
