use crate::stats::GpuRecord;
use std::io::{self, BufRead, Write};

#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tracing::debug;

pub const CUDA_VISIBLE_DEVICES: &str = "CUDA_VISIBLE_DEVICES";

const MAX_PROMPT_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum SelectError {
    #[error("not enough free GPUs: wanted {wanted}, usable {usable}")]
    MoreGpusNeeded { wanted: usize, usable: usize },
    #[error("invalid device id {0:?}")]
    InvalidDeviceId(String),
    #[error("prompt failed: {0}")]
    Io(#[from] io::Error),
}

/// Answers a prompt with one line of input. Injected so selection can
/// be driven by a script in tests instead of a terminal.
#[cfg_attr(test, automock)]
pub trait Confirm {
    fn ask(&mut self, prompt: &str) -> io::Result<String>;
}

/// Prompts on stdout and reads the answer from stdin.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{prompt}")?;
        write!(stdout, ">>> ")?;
        stdout.flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer)
    }
}

/// Ask until the answer is one of `choices` (case-insensitive), up to
/// three attempts, then fall back to `default`.
fn choose(
    confirm: &mut dyn Confirm,
    prompt: &str,
    choices: &[&str],
    default: &str,
) -> io::Result<String> {
    for attempt in 0..MAX_PROMPT_ATTEMPTS {
        let prompt = if attempt == 0 { prompt } else { "Invalid choice!" };
        let answer = confirm.ask(prompt)?.trim().to_lowercase();
        if choices.contains(&answer.as_str()) {
            return Ok(answer);
        }
    }
    Ok(default.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub allow_nonfree: bool,
    pub assume_yes: bool,
    pub blacklist: Vec<usize>,
}

/// One-line device summary shown when proposing busy GPUs.
fn summary(record: &GpuRecord) -> String {
    format!(
        "[{}] F:{} %|T:{} C|P:{}/{} W|C:{}/{} MHz|U:{} %|M:{}/{} MiB",
        record.id,
        record.fan_speed,
        record.temperature,
        record.power_draw,
        record.power_limit,
        record.clock_sm,
        record.clock_max_sm,
        record.utilization,
        record.memory_used,
        record.memory_total,
    )
}

/// Pick `wanted` device ids. Free devices (no compute processes) are
/// preferred, ordered by free memory; busy devices fill the remainder
/// only when allowed, after confirmation unless `assume_yes`. The
/// result is sorted and ready for `CUDA_VISIBLE_DEVICES`.
pub fn auto_select(
    records: &[GpuRecord],
    wanted: usize,
    opts: &SelectOptions,
    confirm: &mut dyn Confirm,
) -> Result<Vec<usize>, SelectError> {
    let usable: Vec<&GpuRecord> = records
        .iter()
        .filter(|r| !opts.blacklist.contains(&r.id))
        .collect();
    if wanted > usable.len() {
        return Err(SelectError::MoreGpusNeeded {
            wanted,
            usable: usable.len(),
        });
    }

    let mut free: Vec<&GpuRecord> = usable.iter().copied().filter(|r| r.is_free()).collect();
    free.sort_by_key(|r| std::cmp::Reverse(r.free_memory_mib()));

    let mut selected: Vec<usize>;
    if wanted <= free.len() {
        selected = free[..wanted].iter().map(|r| r.id).collect();
    } else if opts.allow_nonfree {
        let mut busy: Vec<&GpuRecord> = usable.iter().copied().filter(|r| !r.is_free()).collect();
        busy.sort_by_key(|r| std::cmp::Reverse(r.free_memory_mib()));
        let candidates = &busy[..wanted - free.len()];
        debug!("Proposing busy devices: {:?}", candidates.iter().map(|r| r.id).collect::<Vec<_>>());

        let free_ids: Vec<usize> = free.iter().map(|r| r.id).collect();
        if opts.assume_yes {
            selected = free_ids;
            selected.extend(candidates.iter().map(|r| r.id));
        } else {
            let allowed: Vec<usize> = usable.iter().map(|r| r.id).collect();
            selected = confirm_busy(&free_ids, candidates, &allowed, confirm)?;
        }
    } else {
        return Err(SelectError::MoreGpusNeeded {
            wanted,
            usable: free.len(),
        });
    }

    selected.sort_unstable();
    Ok(selected)
}

/// Parse a comma-separated id list; every id must name a selectable
/// device. The offending token comes back on failure.
fn parse_manual_ids(answer: &str, allowed: &[usize]) -> Result<Vec<usize>, String> {
    let mut ids = Vec::new();
    for part in answer.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id: usize = part.parse().map_err(|_| part.to_string())?;
        if !allowed.contains(&id) {
            return Err(part.to_string());
        }
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn confirm_busy(
    free_ids: &[usize],
    candidates: &[&GpuRecord],
    allowed: &[usize],
    confirm: &mut dyn Confirm,
) -> Result<Vec<usize>, SelectError> {
    let mut prompt = String::from(
        "Not enough free GPUs, would you like to use these busy devices?\n",
    );
    for record in candidates {
        prompt.push_str(&summary(record));
        prompt.push('\n');
    }
    prompt.push_str("Y: use the busy devices\nN: abort\nM: pick device ids manually");

    match choose(confirm, &prompt, &["y", "n", "m"], "n")?.as_str() {
        "y" => {
            let mut selected = free_ids.to_vec();
            selected.extend(candidates.iter().map(|r| r.id));
            Ok(selected)
        }
        "m" => {
            let mut rejected = String::new();
            for attempt in 0..MAX_PROMPT_ATTEMPTS {
                let prompt = if attempt == 0 {
                    "Enter the device ids to use (comma separated)"
                } else {
                    "Invalid choice!"
                };
                let answer = confirm.ask(prompt)?;
                match parse_manual_ids(&answer, allowed) {
                    Ok(ids) if !ids.is_empty() => return Ok(ids),
                    Ok(_) => rejected = answer.trim().to_string(),
                    Err(token) => rejected = token,
                }
            }
            Err(SelectError::InvalidDeviceId(rejected))
        }
        _ => Err(SelectError::MoreGpusNeeded {
            wanted: free_ids.len() + candidates.len(),
            usable: free_ids.len(),
        }),
    }
}

/// `CUDA_VISIBLE_DEVICES` value for a selection.
pub fn devices_value(ids: &[usize]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
