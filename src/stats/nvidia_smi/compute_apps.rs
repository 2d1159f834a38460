use tracing::debug;

/// One running compute process as reported by nvidia-smi, before user
/// and command info is merged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeApp {
    pub gpu_uuid: String,
    pub pid: String,
    pub used_memory_mib: u64,
}

/// Parse `--query-compute-apps` CSV output.
///
/// Format: gpu_uuid, pid, used_memory [MiB]
/// e.g. "GPU-xxx, 4321, 1500"
pub fn parse_compute_apps(output: &str) -> Vec<ComputeApp> {
    let mut apps = Vec::new();
    for line in output.lines() {
        let parts: Vec<&str> = line.split(',').map(|s| s.trim()).collect();
        if parts.len() < 3 {
            debug!("Skipping malformed compute app line: {}", line);
            continue;
        }
        let used_memory_mib = parts[2].parse::<u64>().unwrap_or_else(|_| {
            debug!("Failed to parse used memory: {}", parts[2]);
            0
        });
        apps.push(ComputeApp {
            gpu_uuid: parts[0].to_string(),
            pid: parts[1].to_string(),
            used_memory_mib,
        });
    }
    apps
}
