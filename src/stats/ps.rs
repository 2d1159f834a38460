use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::Command;

#[cfg(test)]
use mockall::automock;
use tracing::debug;

/// User and command line for one OS process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsEntry {
    pub user: String,
    pub command: String,
}

#[cfg_attr(test, automock)]
pub trait ProcessListProvider {
    fn list_processes(&self) -> io::Result<String>;
}

/// Runs the real `ps` binary.
pub struct PsExecutor;

impl ProcessListProvider for PsExecutor {
    fn list_processes(&self) -> io::Result<String> {
        let output = Command::new("ps")
            .args(["axo", "user:20,pid,args"])
            .output()
            .map_err(|e| {
                io::Error::new(io::ErrorKind::NotFound, format!("Failed to run ps: {e}"))
            })?;

        if !output.status.success() {
            return Err(io::Error::other(format!(
                "ps exited with non-zero status: {}",
                output.status
            )));
        }

        debug!("Using ps for the process inventory");
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Replays captured ps output from a file.
pub struct FilePsProvider {
    pub source: PathBuf,
}

impl ProcessListProvider for FilePsProvider {
    fn list_processes(&self) -> io::Result<String> {
        debug!("Reading process inventory from {:?}", self.source);
        fs::read_to_string(&self.source)
    }
}

/// Parse `ps axo user:20,pid,args` output into a pid-keyed map. The
/// header line and lines with fewer than three fields are skipped.
pub fn parse_process_list(output: &str) -> HashMap<String, PsEntry> {
    let mut processes = HashMap::new();
    for line in output.lines().skip(1) {
        let mut words = line.split_whitespace();
        let (Some(user), Some(pid)) = (words.next(), words.next()) else {
            continue;
        };
        let command: Vec<&str> = words.collect();
        if command.is_empty() {
            continue;
        }
        processes.insert(
            pid.to_string(),
            PsEntry {
                user: user.to_string(),
                command: command.join(" "),
            },
        );
    }
    processes
}
