//! Routing daemon start/stop.
//!
//! ## Start
//!
//! 1. Open `<router_dir>` to every user (mode 0777)
//! 2. Write the rendered config to `<router_dir>/<daemon>.conf`
//! 3. Remove a stale `<router_dir>/<daemon>.pid`
//! 4. Launch the binary detached inside the router's namespace, under
//!    `umask 000`
//!
//! Packaged daemons drop privileges to an unprivileged account (`frr`)
//! before writing their pid, socket and log files, so the directory has to
//! be writable by that account.
//!
//! ## Stop
//!
//! Read the pid the daemon wrote, send `SIGTERM`, then remove the pid file
//! and the control socket. Stopping is best-effort: a missing pid file or an
//! already dead process is logged and otherwise ignored. There is no
//! supervision, so a crashed daemon is neither noticed nor restarted.

use super::types::{DaemonKind, ZEBRA_API_SOCKET};
use crate::shell::{NodeShell, ShellError};
use log::{debug, info, warn};
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Mode of a router directory
pub const ROUTER_DIR_MODE: u32 = 0o777;

/// Errors raised while starting a daemon
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Shell(#[from] ShellError),
}

/// Per-router working directory holding config, pid and socket files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonPaths {
    router_dir: PathBuf,
}

impl DaemonPaths {
    pub fn new(router_dir: impl Into<PathBuf>) -> Self {
        Self {
            router_dir: router_dir.into(),
        }
    }

    pub fn router_dir(&self) -> &Path {
        &self.router_dir
    }

    pub fn config_file(&self, kind: DaemonKind) -> PathBuf {
        self.router_dir.join(kind.config_file_name())
    }

    pub fn pid_file(&self, kind: DaemonKind) -> PathBuf {
        self.router_dir.join(kind.pid_file_name())
    }

    pub fn socket_file(&self, kind: DaemonKind) -> PathBuf {
        self.router_dir.join(kind.socket_file_name())
    }

    pub fn zebra_api(&self) -> PathBuf {
        self.router_dir.join(ZEBRA_API_SOCKET)
    }
}

/// Account a daemon runs as once it drops privileges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonUser {
    pub user: String,
    pub group: String,
}

impl DaemonUser {
    pub fn new(user: &str, group: &str) -> Self {
        Self {
            user: user.to_string(),
            group: group.to_string(),
        }
    }
}

/// What a stop request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// SIGTERM was sent to this pid
    Signalled(u32),
    /// No usable pid file, nothing was signalled
    NotRunning,
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> DaemonError + '_ {
    move |source| DaemonError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Command line launching `kind` with its files under `paths`
pub fn daemon_command_line(kind: DaemonKind, binary: &Path, paths: &DaemonPaths, user: &DaemonUser) -> String {
    format!(
        "umask 000; {} --config_file {} --pid_file {} -z {} --vty_socket {} -u {} -g {} {}",
        binary.display(),
        paths.config_file(kind).display(),
        paths.pid_file(kind).display(),
        paths.zebra_api().display(),
        paths.router_dir().display(),
        user.user,
        user.group,
        kind.daemonize_flag()
    )
}

/// Create `dir` if needed and open it to the daemon account
pub fn prepare_router_dir(dir: &Path) -> Result<(), DaemonError> {
    fs::create_dir_all(dir).map_err(io_error(dir))?;
    fs::set_permissions(dir, fs::Permissions::from_mode(ROUTER_DIR_MODE)).map_err(io_error(dir))
}

/// Write the config for `kind` and launch the daemon in the router's namespace
///
/// # Arguments
/// * `shell` - Shell of the router node
/// * `kind` - Which daemon to start
/// * `binary` - Resolved daemon binary
/// * `paths` - The router's working directory layout
/// * `config_text` - Rendered daemon configuration
/// * `user` - Account the daemon drops privileges to
pub fn start_daemon(
    shell: &NodeShell,
    kind: DaemonKind,
    binary: &Path,
    paths: &DaemonPaths,
    config_text: &str,
    user: &DaemonUser,
) -> Result<(), DaemonError> {
    prepare_router_dir(paths.router_dir())?;

    let config_file = paths.config_file(kind);
    fs::write(&config_file, config_text).map_err(io_error(&config_file))?;

    let pid_file = paths.pid_file(kind);
    match fs::remove_file(&pid_file) {
        Ok(()) => debug!("{}: removed stale {}", shell.name(), pid_file.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_error(&pid_file)(e)),
    }

    shell.spawn(&daemon_command_line(kind, binary, paths, user))?;
    info!("{}: started {}", shell.name(), kind);
    Ok(())
}

/// Read the decimal pid on the first line of `path`
pub fn read_pid_file(path: &Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    content.lines().next()?.trim().parse().ok()
}

/// Signal `kind` to exit and remove its pid and socket files
pub fn stop_daemon(shell: &NodeShell, kind: DaemonKind, paths: &DaemonPaths) -> StopOutcome {
    let pid_file = paths.pid_file(kind);
    let Some(pid) = read_pid_file(&pid_file) else {
        debug!(
            "{}: no usable pid file for {} at {}, nothing to stop",
            shell.name(),
            kind,
            pid_file.display()
        );
        return StopOutcome::NotRunning;
    };

    if let Err(e) = shell.cmd(&format!("kill -TERM {}", pid)) {
        warn!("{}: could not signal {} (pid {}): {}", shell.name(), kind, pid, e);
    }

    for file in [pid_file, paths.socket_file(kind)] {
        match fs::remove_file(&file) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("{}: could not remove {}: {}", shell.name(), file.display(), e),
        }
    }

    info!("{}: stopped {} (pid {})", shell.name(), kind, pid);
    StopOutcome::Signalled(pid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::RecordingRunner;
    use std::sync::Arc;

    fn router_shell() -> (Arc<RecordingRunner>, NodeShell) {
        let runner = Arc::new(RecordingRunner::new());
        let shell = NodeShell::in_namespace("r1", runner.clone());
        (runner, shell)
    }

    #[test]
    fn test_start_writes_config_and_spawns() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DaemonPaths::new(dir.path().join("r1"));
        let (runner, shell) = router_shell();

        fs::create_dir_all(paths.router_dir()).unwrap();
        fs::write(paths.pid_file(DaemonKind::Bgpd), "4242\n").unwrap();

        start_daemon(
            &shell,
            DaemonKind::Bgpd,
            Path::new("/usr/lib/frr/bgpd"),
            &paths,
            "router bgp 1000\n",
            &DaemonUser::new("frr", "frr"),
        )
        .unwrap();

        let written = fs::read_to_string(paths.config_file(DaemonKind::Bgpd)).unwrap();
        assert_eq!(written, "router bgp 1000\n");
        assert!(!paths.pid_file(DaemonKind::Bgpd).exists());

        let lines = runner.lines_in(Some("r1"));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("umask 000; /usr/lib/frr/bgpd --config_file "));
        assert!(lines[0].contains(" -u frr -g frr "));
        assert!(lines[0].contains("bgpd.pid"));
        assert!(lines[0].contains("zebra.api"));
        assert!(lines[0].ends_with(" -d"));
    }

    #[test]
    fn test_stop_without_pid_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DaemonPaths::new(dir.path().join("r1"));
        let (runner, shell) = router_shell();

        assert_eq!(stop_daemon(&shell, DaemonKind::Zebra, &paths), StopOutcome::NotRunning);
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_stop_with_garbage_pid_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DaemonPaths::new(dir.path());
        let (runner, shell) = router_shell();
        fs::write(paths.pid_file(DaemonKind::Ripd), "not a pid\n").unwrap();

        assert_eq!(stop_daemon(&shell, DaemonKind::Ripd, &paths), StopOutcome::NotRunning);
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_stop_signals_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DaemonPaths::new(dir.path());
        let (runner, shell) = router_shell();
        fs::write(paths.pid_file(DaemonKind::Zebra), "1234\nextra\n").unwrap();
        fs::write(paths.socket_file(DaemonKind::Zebra), "").unwrap();

        assert_eq!(stop_daemon(&shell, DaemonKind::Zebra, &paths), StopOutcome::Signalled(1234));
        assert_eq!(runner.lines_in(Some("r1")), vec!["kill -TERM 1234"]);
        assert!(!paths.pid_file(DaemonKind::Zebra).exists());
        assert!(!paths.socket_file(DaemonKind::Zebra).exists());
    }

    #[test]
    fn test_zebra_command_line() {
        let paths = DaemonPaths::new("/tmp/lab/r2");
        let user = DaemonUser::new("root", "root");
        let line = daemon_command_line(DaemonKind::Zebra, Path::new("/opt/frr/zebra"), &paths, &user);
        assert_eq!(
            line,
            "umask 000; /opt/frr/zebra --config_file /tmp/lab/r2/zebra.conf --pid_file /tmp/lab/r2/zebra.pid \
             -z /tmp/lab/r2/zebra.api --vty_socket /tmp/lab/r2 -u root -g root --daemon"
        );
    }

    #[test]
    fn test_router_dir_open_to_daemon_account() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DaemonPaths::new(dir.path().join("r1"));
        let (_runner, shell) = router_shell();

        start_daemon(
            &shell,
            DaemonKind::Zebra,
            Path::new("/usr/lib/frr/zebra"),
            &paths,
            "hostname r1\n",
            &DaemonUser::new("frr", "frr"),
        )
        .unwrap();

        let mode = fs::metadata(paths.router_dir()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, ROUTER_DIR_MODE);

        // An existing, tighter directory is opened up as well
        fs::set_permissions(paths.router_dir(), fs::Permissions::from_mode(0o700)).unwrap();
        prepare_router_dir(paths.router_dir()).unwrap();
        let mode = fs::metadata(paths.router_dir()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, ROUTER_DIR_MODE);
    }
}
