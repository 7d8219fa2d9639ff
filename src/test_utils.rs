//! Scripted stand-in for the daemon CLI plus JSON builders for daemon output.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use crate::cli::CommandRunner;
use crate::error::{Result, ZtError};

#[derive(Debug, Clone)]
pub enum Reply {
    Stdout(String),
    Fail(String),
}

/// Replies are queued per subcommand (the first argument). The last reply of
/// a queue repeats forever so a steady state only has to be scripted once.
#[derive(Debug, Default)]
pub struct FakeCli {
    replies: RefCell<HashMap<String, VecDeque<Reply>>>,
    calls: RefCell<Vec<Vec<String>>>,
    spawned: RefCell<Vec<PathBuf>>,
    spawn_error: Option<String>,
    /// Replies that replace the `status` queue once the daemon is spawned.
    after_spawn: RefCell<Option<VecDeque<Reply>>>,
}

impl FakeCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, subcommand: &str, reply: Reply) -> Self {
        self.replies
            .borrow_mut()
            .entry(subcommand.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn ok(self, subcommand: &str, stdout: impl Into<String>) -> Self {
        self.reply(subcommand, Reply::Stdout(stdout.into()))
    }

    pub fn fail(self, subcommand: &str, stderr: impl Into<String>) -> Self {
        self.reply(subcommand, Reply::Fail(stderr.into()))
    }

    pub fn status_after_spawn(self, reply: Reply) -> Self {
        *self.after_spawn.borrow_mut() = Some(VecDeque::from([reply]));
        self
    }

    pub fn failing_spawn(mut self, message: &str) -> Self {
        self.spawn_error = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, subcommand: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.first().map(String::as_str) == Some(subcommand))
            .count()
    }

    pub fn spawned(&self) -> Vec<PathBuf> {
        self.spawned.borrow().clone()
    }

    fn next_reply(&self, subcommand: &str) -> Option<Reply> {
        let mut replies = self.replies.borrow_mut();
        let queue = replies.get_mut(subcommand)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl CommandRunner for FakeCli {
    fn run_json(&self, args: &[&str]) -> Result<Vec<u8>> {
        self.calls
            .borrow_mut()
            .push(args.iter().map(|a| a.to_string()).collect());

        let subcommand = args.first().copied().unwrap_or_default();
        let command = format!("zerotier-cli -j {}", args.join(" "));
        match self.next_reply(subcommand) {
            Some(Reply::Stdout(out)) => Ok(out.into_bytes()),
            Some(Reply::Fail(stderr)) => Err(ZtError::ExternalCommand { command, stderr }),
            None => Err(ZtError::ExternalCommand {
                command,
                stderr: format!("no scripted reply for '{subcommand}'"),
            }),
        }
    }

    fn spawn_daemon(&self, binary: &Path) -> Result<()> {
        self.spawned.borrow_mut().push(binary.to_path_buf());
        if let Some(message) = &self.spawn_error {
            return Err(ZtError::Spawn {
                program: binary.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, message.clone()),
            });
        }
        if let Some(queue) = self.after_spawn.borrow_mut().take() {
            self.replies.borrow_mut().insert("status".to_string(), queue);
        }
        Ok(())
    }
}

pub fn status_json(address: &str, online: bool) -> String {
    format!(
        r#"{{"address":"{address}","clock":1700000000000,"online":{online},
"planetWorldId":149604618,"publicIdentity":"{address}:0:abcdef","tcpFallbackActive":false,
"version":"1.14.0","versionBuild":0,"versionMajor":1,"versionMinor":14,"versionRev":0}}"#
    )
}

pub fn network_json(id: &str, status: &str, addresses: &[&str]) -> String {
    let addresses = addresses
        .iter()
        .map(|a| format!("\"{a}\""))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        r#"{{"allowManaged":true,"assignedAddresses":[{addresses}],"bridge":false,
"broadcastEnabled":true,"dhcp":false,"id":"{id}","mac":"a2:3e:1b:44:5f:01","mtu":2800,
"name":"test-net","netconfRevision":3,"nwid":"{id}","portDeviceName":"zt0",
"portError":0,"routes":[],"status":"{status}","type":"PRIVATE"}}"#
    )
}

pub fn networks_json(networks: &[String]) -> String {
    format!("[{}]", networks.join(","))
}
