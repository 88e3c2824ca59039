//! Rendezvous path allocation for local sockets.
//!
//! Picks a filesystem path (Unix-domain socket) or named-pipe identifier for
//! a listener, probing a few candidate directories for writability. Callers
//! treat any error here as a cue to fall back to loopback TCP.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use tunbind_common::{
    BindError, Result, MAX_SOCKET_PATH_LEN, PIPE_NAMESPACE, SOCKET_DIR_NAME, SOCKET_NAME_PREFIX,
    SOCKET_NAME_SUFFIX,
};
use uuid::Uuid;

// The temp dir is only considered when its own path is short enough to leave
// room for the candidate name under the sun_path limit.
const TMPDIR_LEN_LIMIT: usize = 70;

/// Directories probed for a writable rendezvous location, in order.
///
/// Injectable so the search strategy is testable without touching process
/// state; [`allocate`] fills in the real working and temp directories.
#[derive(Debug, Clone)]
pub struct SearchRoots {
    pub cwd: PathBuf,
    pub temp: PathBuf,
}

impl SearchRoots {
    pub fn from_env() -> std::io::Result<Self> {
        Ok(Self {
            cwd: std::env::current_dir()?,
            temp: std::env::temp_dir(),
        })
    }
}

/// Produce a usable rendezvous path for a listener.
///
/// Distinct listener ids yield distinct paths, so concurrent binds cannot
/// collide as long as the engine keeps ids unique.
pub fn allocate(listener_id: &str) -> Result<PathBuf> {
    if cfg!(windows) {
        return Ok(pipe_name(listener_id));
    }
    let roots = SearchRoots::from_env()?;
    allocate_in(&roots, listener_id)
}

/// Like [`allocate`], with an explicit directory search order.
pub fn allocate_in(roots: &SearchRoots, listener_id: &str) -> Result<PathBuf> {
    let candidate = format!("{SOCKET_NAME_PREFIX}{listener_id}{SOCKET_NAME_SUFFIX}");

    // 1. dedicated subdirectory of the working directory
    let subdir = roots.cwd.join(SOCKET_DIR_NAME);
    if fs::create_dir_all(&subdir).is_ok() && dir_writable(&subdir) {
        return Ok(subdir.join(&candidate));
    }
    debug!("cannot write to {}", subdir.display());

    // 2. the OS temp directory, when short enough
    if roots.temp.as_os_str().len() < TMPDIR_LEN_LIMIT && dir_writable(&roots.temp) {
        return Ok(truncate_path(roots.temp.join(&candidate)));
    }
    debug!("cannot use temp dir {}", roots.temp.display());

    // 3. the working directory itself
    if dir_writable(&roots.cwd) {
        return Ok(roots.cwd.join(candidate));
    }
    Err(BindError::NoWritableDir(roots.cwd.display().to_string()))
}

/// The fixed pipe-namespace path used on Windows.
pub fn pipe_name(listener_id: &str) -> PathBuf {
    PathBuf::from(format!(
        "{PIPE_NAMESPACE}{SOCKET_NAME_PREFIX}{listener_id}{SOCKET_NAME_SUFFIX}"
    ))
}

/// Tighten a freshly-bound socket file to owner-only access, best-effort.
pub fn tighten_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(err) = fs::set_permissions(path, fs::Permissions::from_mode(0o700)) {
            debug!("cannot change permissions of {}: {err}", path.display());
        }
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

fn dir_writable(dir: &Path) -> bool {
    let probe = dir.join(format!(".probe-{}", Uuid::new_v4()));
    match fs::File::create(&probe) {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

/// Keep the joined path within the domain-socket limit.
fn truncate_path(path: PathBuf) -> PathBuf {
    let mut s = path.to_string_lossy().into_owned();
    if s.len() > MAX_SOCKET_PATH_LEN {
        let mut end = MAX_SOCKET_PATH_LEN;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    PathBuf::from(s)
}
