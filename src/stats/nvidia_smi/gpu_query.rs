use crate::stats::GpuRecord;
use tracing::debug;

/// Parse `--query-gpu` CSV output into one record per device.
///
/// Format: index, uuid, fan.speed [%], temperature.gpu [C],
/// utilization.gpu [%], memory.used/total/free [MiB], power.draw [W],
/// power.limit [W], clocks.sm [MHz], clocks.max.sm [MHz]
/// e.g. "0, GPU-xxx, 30, 45, 12, 100, 16000, 15900, 50.00, 250.00, 300, 1800"
///
/// Values nvidia-smi cannot report come through as `[N/A]` or
/// `[Not Supported]` and are kept verbatim for display.
pub fn parse_device_query(output: &str) -> Vec<GpuRecord> {
    let mut records = Vec::new();
    for line in output.lines() {
        let parts: Vec<&str> = line.split(',').map(|s| s.trim()).collect();
        if parts.len() < 12 {
            debug!("Skipping malformed device line: {}", line);
            continue;
        }

        let Ok(id) = parts[0].parse::<usize>() else {
            debug!("Failed to parse device index: {}", parts[0]);
            continue;
        };

        records.push(GpuRecord {
            id,
            uuid: parts[1].to_string(),
            fan_speed: parts[2].to_string(),
            temperature: parts[3].to_string(),
            utilization: parts[4].to_string(),
            memory_used: parts[5].to_string(),
            memory_total: parts[6].to_string(),
            memory_free: parts[7].to_string(),
            power_draw: parts[8].to_string(),
            power_limit: parts[9].to_string(),
            clock_sm: parts[10].to_string(),
            clock_max_sm: parts[11].to_string(),
            processes: Vec::new(),
        });
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_devices() {
        let output = "0, GPU-aaa, 30, 45, 12, 100, 16000, 15900, 50.00, 250.00, 300, 1800\n\
                      1, GPU-bbb, [N/A], 60, 95, 15000, 16000, 1000, 240.12, 250.00, 1750, 1800";
        let records = parse_device_query(output);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 0);
        assert_eq!(records[0].uuid, "GPU-aaa");
        assert_eq!(records[0].memory_total, "16000");
        assert_eq!(records[1].fan_speed, "[N/A]");
        assert_eq!(records[1].clock_max_sm, "1800");
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let output = "0, GPU-aaa, 30, 45, 12, 100, 16000, 15900, 50.00, 250.00, 300, 1800\n\
                      1, GPU-bbb, 20, 50";
        let records = parse_device_query(output);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_device_query("").is_empty());
    }

    #[test]
    fn test_unparseable_index_is_skipped() {
        let output = "zero, GPU-aaa, 30, 45, 12, 100, 16000, 15900, 50.00, 250.00, 300, 1800";
        assert!(parse_device_query(output).is_empty());
    }
}
