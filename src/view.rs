use crate::stats::GpuRecord;
use crate::table::{self, Align, RenderError, StyleSpec, Token};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Displayable device-table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Column {
    Id,
    Fan,
    Temp,
    Pwr,
    PwrMax,
    Freq,
    FreqMax,
    Util,
    Vmem,
    UsedMem,
    TotalMem,
    FreeMem,
    Users,
}

impl Column {
    pub fn default_set() -> Vec<Column> {
        vec![
            Column::Id,
            Column::Fan,
            Column::Temp,
            Column::Pwr,
            Column::Freq,
            Column::Util,
            Column::Vmem,
            Column::Users,
        ]
    }

    fn header(self) -> &'static str {
        match self {
            Column::Id => "ID",
            Column::Fan => "Fan",
            Column::Temp => "Temp",
            Column::Pwr => "Pwr",
            Column::PwrMax => "PwrMax",
            Column::Freq => "Freq",
            Column::FreqMax => "FreqMax",
            Column::Util => "Util",
            Column::Vmem => "Vmem",
            Column::UsedMem => "UsedMem",
            Column::TotalMem => "TotalMem",
            Column::FreeMem => "FreeMem",
            Column::Users => "Users",
        }
    }

    fn align(self) -> Align {
        match self {
            Column::Users => Align::Left,
            _ => Align::Right,
        }
    }

    fn cell(self, record: &GpuRecord, vertical: bool) -> String {
        match self {
            Column::Id => record.id.to_string(),
            Column::Fan => format!("{} %", record.fan_speed),
            Column::Temp => format!("{} C", record.temperature),
            Column::Pwr => format!("{} W", record.power_draw),
            Column::PwrMax => format!("{} W", record.power_limit),
            Column::Freq => format!("{} MHz", record.clock_sm),
            Column::FreqMax => format!("{} MHz", record.clock_max_sm),
            Column::Util => format!("{} %", record.utilization),
            Column::Vmem => format!("{}/{} MiB", record.memory_used, record.memory_total),
            Column::UsedMem => format!("{} MiB", record.memory_used),
            Column::TotalMem => format!("{} MiB", record.memory_total),
            Column::FreeMem => format!("{} MiB", record.memory_free),
            Column::Users => users_cell(record, vertical),
        }
    }
}

/// Per-user pid groups, `user(pid|pid)` joined by commas, or by line
/// breaks in vertical mode so long user lists wrap per user.
fn users_cell(record: &GpuRecord, vertical: bool) -> String {
    let mut users: Vec<(&str, Vec<&str>)> = Vec::new();
    for process in &record.processes {
        match users.iter_mut().find(|(user, _)| *user == process.user) {
            Some((_, pids)) => pids.push(&process.pid),
            None => users.push((&process.user, vec![&process.pid])),
        }
    }
    let separator = if vertical { "\n" } else { "," };
    users
        .iter()
        .map(|(user, pids)| format!("{user}({})", pids.join("|")))
        .collect::<Vec<_>>()
        .join(separator)
}

#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub columns: Vec<Column>,
    pub col_style: Option<StyleSpec>,
    pub limits: Option<Vec<Option<usize>>>,
    pub show_command: bool,
    pub vertical: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        ViewOptions {
            columns: Column::default_set(),
            col_style: None,
            limits: None,
            show_command: true,
            vertical: false,
        }
    }
}

/// Column style derived from the enabled columns: numbers on the
/// right, user lists on the left, borders around everything.
fn derived_col_style(columns: &[Column]) -> StyleSpec {
    let mut tokens = vec![Token::Border];
    for column in columns {
        tokens.push(Token::Slot(column.align()));
        tokens.push(Token::Border);
    }
    StyleSpec {
        tokens,
        limits: vec![None; columns.len()],
    }
}

/// Header row plus one row per device, with a rule under the header.
pub fn device_table(records: &[GpuRecord], opts: &ViewOptions) -> Result<String, RenderError> {
    let mut rows = vec![
        opts.columns
            .iter()
            .map(|c| c.header().to_string())
            .collect::<Vec<_>>(),
    ];
    for record in records {
        rows.push(
            opts.columns
                .iter()
                .map(|c| c.cell(record, opts.vertical))
                .collect(),
        );
    }

    let row_style = StyleSpec::parse(&format!("|c|{}|", "c".repeat(records.len())))?;
    let col_style = match &opts.col_style {
        Some(spec) => spec.clone(),
        None => derived_col_style(&opts.columns),
    };
    table::render(&rows, Some(&row_style), Some(&col_style), opts.limits.as_deref())
}

/// The `Process Info` sub-table: one line per unique pid with its
/// owning user, summed video memory and command, wrapped into a single
/// left-aligned column sized to the device table above it.
pub fn process_table(records: &[GpuRecord], table_width: usize) -> Result<String, RenderError> {
    struct ProcLine {
        pid: String,
        user: String,
        command: String,
        vmem_mib: u64,
        gpus: Vec<String>,
    }

    let mut procs: Vec<ProcLine> = Vec::new();
    for record in records {
        for process in &record.processes {
            match procs.iter_mut().find(|p| p.pid == process.pid) {
                Some(proc_line) => {
                    proc_line.vmem_mib += process.used_memory_mib;
                    proc_line.gpus.push(record.id.to_string());
                }
                None => procs.push(ProcLine {
                    pid: process.pid.clone(),
                    user: process.user.clone(),
                    command: process.command.clone(),
                    vmem_mib: process.used_memory_mib,
                    gpus: vec![record.id.to_string()],
                }),
            }
        }
    }

    let body = if procs.is_empty() {
        "No running processes found".to_string()
    } else {
        procs
            .iter()
            .map(|p| {
                format!(
                    "[{:>5}|{}] {}({} MiB) {}",
                    p.pid,
                    p.gpus.join(","),
                    p.user,
                    p.vmem_mib,
                    p.command
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    // 4 = the outer borders and their joining spaces
    let inner = table_width.saturating_sub(4).max(1);
    let title = table::justify("Process Info", Align::Center, inner);
    let rows = vec![vec![title], vec![body]];
    let row_style = StyleSpec::parse("c|c|")?;
    let col_style = StyleSpec::parse("|l|")?;
    table::render(&rows, Some(&row_style), Some(&col_style), Some(&[Some(inner)]))
}

/// The full report: the device table, optionally followed by the
/// process sub-table at matching width.
pub fn report(records: &[GpuRecord], opts: &ViewOptions) -> Result<String, RenderError> {
    let devices = device_table(records, opts)?;
    if !opts.show_command {
        return Ok(devices);
    }
    let width = devices.lines().next().map(|l| l.chars().count()).unwrap_or(0);
    let processes = process_table(records, width)?;
    Ok(format!("{devices}\n{processes}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::GpuProcess;

    fn record(id: usize, processes: Vec<GpuProcess>) -> GpuRecord {
        GpuRecord {
            id,
            uuid: format!("GPU-{id}"),
            fan_speed: "30".to_string(),
            temperature: "45".to_string(),
            utilization: "12".to_string(),
            memory_used: "100".to_string(),
            memory_total: "16000".to_string(),
            memory_free: "15900".to_string(),
            power_draw: "50.00".to_string(),
            power_limit: "250.00".to_string(),
            clock_sm: "300".to_string(),
            clock_max_sm: "1800".to_string(),
            processes,
        }
    }

    fn process(pid: &str, user: &str, vmem: u64) -> GpuProcess {
        GpuProcess {
            pid: pid.to_string(),
            used_memory_mib: vmem,
            user: user.to_string(),
            command: format!("cmd-{pid}"),
        }
    }

    #[test]
    fn test_device_table_header_and_rows() {
        let records = vec![record(0, vec![]), record(1, vec![])];
        let opts = ViewOptions::default();
        let out = device_table(&records, &opts).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        // rule, header, rule, two device rows, rule
        assert_eq!(lines.len(), 6);
        assert!(lines[1].contains("ID"));
        assert!(lines[1].contains("Users"));
        assert!(lines[3].contains("100/16000 MiB"));
        assert!(lines[2].starts_with('+'));
    }

    #[test]
    fn test_users_cell_groups_pids_by_user() {
        let rec = record(
            0,
            vec![
                process("10", "alice", 100),
                process("11", "bob", 100),
                process("12", "alice", 100),
            ],
        );
        assert_eq!(users_cell(&rec, false), "alice(10|12),bob(11)");
        assert_eq!(users_cell(&rec, true), "alice(10|12)\nbob(11)");
    }

    #[test]
    fn test_process_table_sums_vmem_across_gpus() {
        let shared = process("42", "alice", 700);
        let records = vec![
            record(0, vec![shared.clone()]),
            record(1, vec![shared, process("43", "bob", 100)]),
        ];
        let out = process_table(&records, 60).unwrap();
        assert!(out.contains("[   42|0,1] alice(1400 MiB) cmd-42"));
        assert!(out.contains("[   43|1] bob(100 MiB) cmd-43"));
        assert!(out.contains("Process Info"));
    }

    #[test]
    fn test_process_table_without_processes() {
        let records = vec![record(0, vec![])];
        let out = process_table(&records, 60).unwrap();
        assert!(out.contains("No running processes found"));
    }

    #[test]
    fn test_report_aligns_sub_table_width() {
        let records = vec![record(0, vec![process("42", "alice", 700)])];
        let out = report(&records, &ViewOptions::default()).unwrap();
        let widths: Vec<usize> = out.lines().map(|l| l.chars().count()).collect();
        // long commands wrap instead of widening the sub-table
        assert!(widths.iter().all(|w| *w <= widths[0]));
    }

    #[test]
    fn test_custom_column_style_and_limits() {
        let records = vec![record(0, vec![])];
        let opts = ViewOptions {
            columns: vec![Column::Id, Column::Util],
            col_style: Some(StyleSpec::parse("|c|c|").unwrap()),
            limits: Some(vec![None, Some(3)]),
            show_command: false,
            vertical: false,
        };
        let out = report(&records, &opts).unwrap();
        // "12 %" wraps at the 3-character limit
        assert!(out.contains("12 "));
        assert_eq!(out.lines().count(), 7);
    }
}
