pub mod nvidia_smi;
pub mod ps;

use nvidia_smi::NvidiaSmiProvider;
use ps::ProcessListProvider;
use std::io;
use tracing::debug;

/// One GPU as reported by nvidia-smi, with its compute processes
/// merged in. Telemetry values stay display strings; nvidia-smi
/// reports `[N/A]` for fields a device cannot provide and those pass
/// through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuRecord {
    pub id: usize,
    pub uuid: String,
    pub fan_speed: String,
    pub temperature: String,
    pub utilization: String,
    pub memory_used: String,
    pub memory_total: String,
    pub memory_free: String,
    pub power_draw: String,
    pub power_limit: String,
    pub clock_sm: String,
    pub clock_max_sm: String,
    pub processes: Vec<GpuProcess>,
}

/// A compute process attached to one GPU, with user and command info
/// from the process inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuProcess {
    pub pid: String,
    pub used_memory_mib: u64,
    pub user: String,
    pub command: String,
}

impl GpuRecord {
    pub fn is_free(&self) -> bool {
        self.processes.is_empty()
    }

    /// Free memory in MiB, zero when the value is not numeric.
    pub fn free_memory_mib(&self) -> u64 {
        self.memory_free.parse().unwrap_or(0)
    }
}

/// Query both sources and join them: compute apps attach to devices by
/// GPU uuid, users and commands attach to apps by pid. Processes whose
/// pid is missing from the inventory keep a placeholder user.
pub fn collect(
    smi: &dyn NvidiaSmiProvider,
    ps_provider: &dyn ProcessListProvider,
) -> io::Result<Vec<GpuRecord>> {
    let mut records = nvidia_smi::parse_device_query(&smi.query_devices()?);
    let apps = nvidia_smi::parse_compute_apps(&smi.query_compute_apps()?);
    let inventory = parse_inventory(ps_provider);

    for app in apps {
        let Some(record) = records.iter_mut().find(|r| r.uuid == app.gpu_uuid) else {
            debug!("Compute app on unknown GPU {}", app.gpu_uuid);
            continue;
        };
        let (user, command) = match inventory.get(&app.pid) {
            Some(entry) => (entry.user.clone(), entry.command.clone()),
            None => ("?".to_string(), String::new()),
        };
        record.processes.push(GpuProcess {
            pid: app.pid,
            used_memory_mib: app.used_memory_mib,
            user,
            command,
        });
    }
    Ok(records)
}

fn parse_inventory(
    ps_provider: &dyn ProcessListProvider,
) -> std::collections::HashMap<String, ps::PsEntry> {
    match ps_provider.list_processes() {
        Ok(output) => ps::parse_process_list(&output),
        Err(e) => {
            // GPU info is still useful without user names
            debug!("Failed to list processes: {}", e);
            Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvidia_smi::MockNvidiaSmiProvider;
    use ps::MockProcessListProvider;

    fn smi_fixture() -> MockNvidiaSmiProvider {
        let mut smi = MockNvidiaSmiProvider::new();
        smi.expect_query_devices().returning(|| {
            Ok("0, GPU-aaa, 30, 45, 12, 100, 16000, 15900, 50.00, 250.00, 300, 1800\n\
                1, GPU-bbb, 35, 60, 95, 15000, 16000, 1000, 240.00, 250.00, 1750, 1800"
                .to_string())
        });
        smi.expect_query_compute_apps()
            .returning(|| Ok("GPU-bbb, 4321, 1500\nGPU-bbb, 987, 200".to_string()));
        smi
    }

    #[test]
    fn test_collect_merges_apps_and_users() {
        let smi = smi_fixture();
        let mut ps = MockProcessListProvider::new();
        ps.expect_list_processes().returning(|| {
            Ok("USER PID COMMAND\nalice 4321 python train.py\nbob 987 ffmpeg -i in.mp4"
                .to_string())
        });

        let records = collect(&smi, &ps).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_free());
        assert_eq!(records[1].processes.len(), 2);
        assert_eq!(records[1].processes[0].user, "alice");
        assert_eq!(records[1].processes[0].command, "python train.py");
        assert_eq!(records[1].processes[1].used_memory_mib, 200);
        assert_eq!(records[0].free_memory_mib(), 15900);
    }

    #[test]
    fn test_unknown_pid_gets_placeholder_user() {
        let smi = smi_fixture();
        let mut ps = MockProcessListProvider::new();
        ps.expect_list_processes()
            .returning(|| Ok("USER PID COMMAND".to_string()));

        let records = collect(&smi, &ps).unwrap();
        assert_eq!(records[1].processes[0].user, "?");
        assert_eq!(records[1].processes[0].command, "");
    }

    #[test]
    fn test_ps_failure_does_not_sink_the_query() {
        let smi = smi_fixture();
        let mut ps = MockProcessListProvider::new();
        ps.expect_list_processes()
            .returning(|| Err(io::Error::new(io::ErrorKind::NotFound, "no ps")));

        let records = collect(&smi, &ps).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].processes[0].user, "?");
    }

    #[test]
    fn test_smi_failure_propagates() {
        let mut smi = MockNvidiaSmiProvider::new();
        smi.expect_query_devices()
            .returning(|| Err(io::Error::new(io::ErrorKind::NotFound, "no nvidia-smi")));
        let mut ps = MockProcessListProvider::new();
        ps.expect_list_processes()
            .returning(|| Ok(String::new()));

        assert!(collect(&smi, &ps).is_err());
    }
}
