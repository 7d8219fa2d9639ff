//! Access to the local daemon through its command-line tool.
//!
//! Every query is a fresh `<cli> -j <args>` subprocess; nothing is cached and
//! nothing is retried here. Retry policy belongs to the callers in
//! [`crate::network::endpoint`].

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Result, ZtError};

/// Capability to talk to the daemon. Swapped for a scripted double in tests.
pub trait CommandRunner {
    /// Run `<cli> -j <args...>` and return captured stdout.
    fn run_json(&self, args: &[&str]) -> Result<Vec<u8>>;

    /// Launch the daemon executable without waiting for it to exit.
    fn spawn_daemon(&self, binary: &Path) -> Result<()>;
}

/// Subprocess-backed runner for `zerotier-cli`.
#[derive(Debug, Clone)]
pub struct ZeroTierCli {
    program: PathBuf,
}

impl ZeroTierCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn describe(&self, args: &[&str]) -> String {
        let mut line = format!("{} -j", self.program.display());
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

impl Default for ZeroTierCli {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CLI_PROGRAM)
    }
}

impl CommandRunner for ZeroTierCli {
    fn run_json(&self, args: &[&str]) -> Result<Vec<u8>> {
        let command = self.describe(args);
        debug!(%command, "running daemon query");

        let output = Command::new(&self.program)
            .arg("-j")
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ZtError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ZtError::ExternalCommand {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(output.stdout)
    }

    fn spawn_daemon(&self, binary: &Path) -> Result<()> {
        // The child handle is dropped on purpose: the daemon outlives us and
        // readiness is checked by pinging, not by waiting on the process.
        Command::new(binary)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map(|_child| ())
            .map_err(|source| ZtError::Spawn {
                program: binary.to_path_buf(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_includes_json_flag() {
        let cli = ZeroTierCli::new("/usr/sbin/zerotier-cli");
        assert_eq!(
            cli.describe(&["join", "8056c2e21c000001"]),
            "/usr/sbin/zerotier-cli -j join 8056c2e21c000001"
        );
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let cli = ZeroTierCli::new("/nonexistent/zerotier-cli");
        match cli.run_json(&["status"]) {
            Err(ZtError::Spawn { program, .. }) => {
                assert_eq!(program, PathBuf::from("/nonexistent/zerotier-cli"));
            }
            other => panic!("expected Spawn error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_daemon_binary_is_spawn_error() {
        let cli = ZeroTierCli::default();
        let result = cli.spawn_daemon(Path::new("/nonexistent/zerotier-one"));
        assert!(matches!(result, Err(ZtError::Spawn { .. })));
    }

    #[cfg(unix)]
    mod script {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        fn write_script(dir: &tempfile::TempDir, body: &str) -> PathBuf {
            let path = dir.path().join("fake-zerotier-cli");
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn test_stdout_is_returned_on_success() {
            let dir = tempfile::tempdir().unwrap();
            let script = write_script(&dir, r#"echo "$@""#);
            let cli = ZeroTierCli::new(script);

            let out = cli.run_json(&["listnetworks"]).unwrap();
            assert_eq!(String::from_utf8(out).unwrap().trim(), "-j listnetworks");
        }

        #[test]
        fn test_stderr_is_returned_on_failure() {
            let dir = tempfile::tempdir().unwrap();
            let script = write_script(&dir, "echo 'ignored stdout'\necho 'zerotier-cli: missing authentication token' >&2\nexit 2");
            let cli = ZeroTierCli::new(script);

            match cli.run_json(&["status"]) {
                Err(ZtError::ExternalCommand { command, stderr }) => {
                    assert!(command.ends_with("-j status"));
                    assert_eq!(stderr, "zerotier-cli: missing authentication token\n");
                }
                other => panic!("expected ExternalCommand error, got {other:?}"),
            }
        }
    }
}
