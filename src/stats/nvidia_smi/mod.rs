mod compute_apps;
mod gpu_query;

pub use compute_apps::{ComputeApp, parse_compute_apps};
pub use gpu_query::parse_device_query;

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::Command;

#[cfg(test)]
use mockall::automock;
use tracing::debug;

pub const DEVICE_QUERY_FIELDS: &str = "index,uuid,fan.speed,temperature.gpu,\
utilization.gpu,memory.used,memory.total,memory.free,power.draw,power.limit,\
clocks.sm,clocks.max.sm";

pub const COMPUTE_APPS_FIELDS: &str = "gpu_uuid,pid,used_memory";

#[cfg_attr(test, automock)]
pub trait NvidiaSmiProvider {
    fn query_devices(&self) -> io::Result<String>;
    fn query_compute_apps(&self) -> io::Result<String>;
}

/// Runs the real `nvidia-smi` binary in CSV query mode.
pub struct NvidiaSmiExecutor;

impl NvidiaSmiExecutor {
    pub fn new() -> Self {
        Self {}
    }

    fn run_query(&self, query_flag: &str) -> io::Result<String> {
        let output = Command::new("nvidia-smi")
            .args([query_flag, "--format=csv,noheader,nounits"])
            .output()
            .map_err(|e| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("Failed to run nvidia-smi: {e}"),
                )
            })?;

        if !output.status.success() {
            return Err(io::Error::other(format!(
                "nvidia-smi exited with non-zero status: {}. stderr: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Default for NvidiaSmiExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl NvidiaSmiProvider for NvidiaSmiExecutor {
    fn query_devices(&self) -> io::Result<String> {
        debug!("Querying nvidia-smi for devices");
        self.run_query(&format!("--query-gpu={DEVICE_QUERY_FIELDS}"))
    }

    fn query_compute_apps(&self) -> io::Result<String> {
        debug!("Querying nvidia-smi for compute apps");
        self.run_query(&format!("--query-compute-apps={COMPUTE_APPS_FIELDS}"))
    }
}

/// Replays captured nvidia-smi output from files, as configured by the
/// redirect section of the config file. A missing source behaves like a
/// query with no results.
pub struct FileSmiProvider {
    pub devices: Option<PathBuf>,
    pub apps: Option<PathBuf>,
}

impl NvidiaSmiProvider for FileSmiProvider {
    fn query_devices(&self) -> io::Result<String> {
        match &self.devices {
            Some(path) => {
                debug!("Reading device query output from {:?}", path);
                fs::read_to_string(path)
            }
            None => Ok(String::new()),
        }
    }

    fn query_compute_apps(&self) -> io::Result<String> {
        match &self.apps {
            Some(path) => {
                debug!("Reading compute apps output from {:?}", path);
                fs::read_to_string(path)
            }
            None => Ok(String::new()),
        }
    }
}
