//! Parsers for remote command output
//!
//! Each parser maps the raw stdout of one command to one sub-record of the
//! snapshot. Parsers are total: malformed or empty input yields sentinel
//! values (`"Unknown"`, `0`, empty lists), never an error or a panic.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::metrics::{
    CoreMetrics, CpuMetrics, DiskMetrics, MemoryMetrics, ProcessRecord, SystemIdentity, UNKNOWN,
    round_to,
};

/// Aggregate CPU summary line
pub const CPU_TOTAL_COMMAND: &str = "top -bn1 | grep 'Cpu(s)'";
/// Per-core CPU statistics over a one second window
pub const CPU_PER_CORE_COMMAND: &str = "mpstat -P ALL 1 1";
/// Memory summary in megabytes
pub const MEMORY_COMMAND: &str = "free -m";
/// Root filesystem usage
pub const DISK_COMMAND: &str = "df -h /";
/// CPU topology
pub const CPU_INFO_COMMAND: &str = "lscpu";
/// OS identification
pub const OS_RELEASE_COMMAND: &str = "cat /etc/os-release";

/// Builds the process table command listing the `limit` busiest processes
#[must_use]
pub fn process_command(limit: usize) -> String {
    format!("ps aux --sort=-%cpu | head -{}", limit + 1)
}

/// Idle percentage in a `top` summary line: `95.5 id`, `95,5 id` or `95.5%id`
static TOP_IDLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:[.,]\d+)?)\s*%?\s*id\b").expect("TOP_IDLE_REGEX is a valid regex pattern")
});

/// Column layout of an `mpstat -P ALL` report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MpstatColumns {
    cpu: usize,
    user: usize,
    system: usize,
    iowait: usize,
    idle: usize,
}

impl MpstatColumns {
    /// Standard sysstat layout relative to the CPU column
    const fn standard(cpu: usize) -> Self {
        Self {
            cpu,
            user: cpu + 1,
            system: cpu + 3,
            iowait: cpu + 4,
            idle: cpu + 10,
        }
    }

    /// Locates the columns from a header line such as
    /// `12:00:01 PM  CPU  %usr  %nice  %sys  %iowait ... %idle`
    fn from_header(tokens: &[&str]) -> Option<Self> {
        let find = |names: &[&str]| tokens.iter().position(|t| names.iter().any(|n| n == t));
        Some(Self {
            cpu: find(&["CPU"])?,
            user: find(&["%usr", "%user"])?,
            system: find(&["%sys", "%system"])?,
            iowait: find(&["%iowait"])?,
            idle: find(&["%idle"])?,
        })
    }
}

/// Stateless parser for remote command output
pub struct MetricsParser;

impl MetricsParser {
    /// Parses host identity from `/etc/os-release` and `lscpu` output.
    ///
    /// `total_cores` is 0 when `lscpu` does not report `CPU(s):`.
    #[must_use]
    pub fn parse_system_identity(os_release: &str, lscpu: &str, max_cores: u32) -> SystemIdentity {
        let os = Self::extract_pretty_name(os_release).unwrap_or_else(|| {
            debug!("os-release has no usable name");
            UNKNOWN.to_string()
        });
        let cpu_model = Self::lscpu_field(lscpu, "Model name")
            .map_or_else(|| UNKNOWN.to_string(), str::to_string);
        let total_cores = Self::lscpu_field(lscpu, "CPU(s)")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        SystemIdentity {
            os,
            cpu_model,
            total_cores,
            max_cores,
        }
    }

    /// Parses CPU utilisation from `top`, `mpstat` and `lscpu` output
    #[must_use]
    pub fn parse_cpu(top: &str, mpstat: &str, lscpu: &str) -> CpuMetrics {
        let speed = Self::lscpu_field(lscpu, "CPU MHz")
            .or_else(|| Self::lscpu_field(lscpu, "CPU max MHz"))
            .map_or_else(|| UNKNOWN.to_string(), str::to_string);

        CpuMetrics {
            usage: Self::parse_cpu_usage(top),
            cores: Self::parse_cores(mpstat),
            model: Self::lscpu_field(lscpu, "Model name")
                .map_or_else(|| UNKNOWN.to_string(), str::to_string),
            speed,
        }
    }

    /// Aggregate usage `100 - idle` from a `top -bn1` summary line.
    ///
    /// Clamped to 0–100 and rounded to two decimals; 0.0 if no idle value.
    #[must_use]
    pub fn parse_cpu_usage(top: &str) -> f64 {
        let Some(idle) = TOP_IDLE_REGEX
            .captures(top)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
        else {
            debug!("No idle percentage in top output");
            return 0.0;
        };
        round_to((100.0 - idle).clamp(0.0, 100.0), 2)
    }

    /// Per-core records from an `mpstat -P ALL` report, in source order.
    ///
    /// Only rows that start with a digit and carry a numeric core index are
    /// kept, which drops headers, blank lines, `all` and `Average:` rows.
    #[must_use]
    pub fn parse_cores(mpstat: &str) -> Vec<CoreMetrics> {
        let columns = Self::mpstat_columns(mpstat);
        let mut cores = Vec::new();

        for line in mpstat.lines() {
            let line = line.trim();
            if !line.starts_with(|c: char| c.is_ascii_digit()) {
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let columns = columns.unwrap_or_else(|| Self::fallback_columns(&tokens));

            let Some(index) = tokens.get(columns.cpu).and_then(|t| t.parse::<u32>().ok()) else {
                continue;
            };
            let field = |i: usize| tokens.get(i).and_then(|t| Self::parse_decimal(t));
            let (Some(user), Some(system), Some(iowait), Some(idle)) = (
                field(columns.user),
                field(columns.system),
                field(columns.iowait),
                field(columns.idle),
            ) else {
                debug!(line, "Skipping malformed mpstat row");
                continue;
            };

            cores.push(CoreMetrics {
                core: format!("CPU {index}"),
                user: round_to(user, 2),
                system: round_to(system, 2),
                iowait: round_to(iowait, 2),
                idle: round_to(idle, 2),
                usage: round_to((100.0 - idle).clamp(0.0, 100.0), 2),
            });
        }

        cores
    }

    /// Parses the `Mem:` row of `free -m`
    #[must_use]
    pub fn parse_memory(free: &str) -> MemoryMetrics {
        let row = free
            .lines()
            .find(|l| l.trim_start().starts_with("Mem:"))
            .or_else(|| free.lines().nth(1));
        let Some(row) = row else {
            debug!("Empty free output");
            return MemoryMetrics::default();
        };

        let tokens: Vec<&str> = row.split_whitespace().collect();
        let value = |i: usize| -> u64 { tokens.get(i).and_then(|t| t.parse().ok()).unwrap_or(0) };
        let (total, used, free) = (value(1), value(2), value(3));

        MemoryMetrics {
            total,
            used,
            free,
            usage_percent: Self::percent(used, total),
        }
    }

    /// Parses the data row of `df -h /`.
    ///
    /// A long device name may wrap the row onto two lines; the fields are
    /// read from the token stream after the header either way.
    #[must_use]
    pub fn parse_disk(df: &str) -> DiskMetrics {
        let tokens: Vec<&str> = df
            .lines()
            .skip_while(|l| l.trim().is_empty())
            .skip(1)
            .flat_map(str::split_whitespace)
            .collect();

        let field = |i: usize| {
            tokens
                .get(i)
                .map_or_else(|| UNKNOWN.to_string(), |t| (*t).to_string())
        };

        DiskMetrics {
            total: field(1),
            used: field(2),
            free: field(3),
            usage: field(4),
        }
    }

    /// Parses `ps aux` rows after the header.
    ///
    /// Rows with fewer than 11 columns or a non-numeric pid, %CPU or %MEM
    /// are skipped. The command is reduced to its executable token.
    #[must_use]
    pub fn parse_processes(ps: &str) -> Vec<ProcessRecord> {
        ps.lines()
            .skip_while(|l| l.trim().is_empty())
            .skip(1)
            .filter_map(|line| {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                if tokens.len() < 11 {
                    if !tokens.is_empty() {
                        debug!(line, "Skipping short ps row");
                    }
                    return None;
                }
                Some(ProcessRecord {
                    user: tokens[0].to_string(),
                    pid: tokens[1].parse().ok()?,
                    cpu: Self::parse_decimal(tokens[2])?,
                    memory: Self::parse_decimal(tokens[3])?,
                    command: tokens[10].to_string(),
                })
            })
            .collect()
    }

    /// `used / total * 100` rounded to one decimal, 0.0 for an empty total
    #[allow(clippy::cast_precision_loss)]
    fn percent(used: u64, total: u64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        round_to(used as f64 / total as f64 * 100.0, 1)
    }

    fn parse_decimal(token: &str) -> Option<f64> {
        token
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }

    /// Picks the column layout from the first header row of the report
    fn mpstat_columns(mpstat: &str) -> Option<MpstatColumns> {
        mpstat
            .lines()
            .map(|l| l.split_whitespace().collect::<Vec<_>>())
            .find(|tokens| tokens.contains(&"CPU") && tokens.contains(&"%idle"))
            .and_then(|tokens| MpstatColumns::from_header(&tokens))
    }

    /// Standard layout for a data row when the report has no header.
    /// A 12-hour timestamp takes two tokens.
    fn fallback_columns(tokens: &[&str]) -> MpstatColumns {
        match tokens.get(1) {
            Some(&("AM" | "PM")) => MpstatColumns::standard(2),
            _ => MpstatColumns::standard(1),
        }
    }

    /// Value of a `Key:   value` line in `lscpu` output
    fn lscpu_field<'a>(lscpu: &'a str, key: &str) -> Option<&'a str> {
        lscpu.lines().find_map(|line| {
            let (k, v) = line.split_once(':')?;
            let v = v.trim();
            (k.trim() == key && !v.is_empty()).then_some(v)
        })
    }

    /// Extracts `PRETTY_NAME` from `/etc/os-release` content, falling back
    /// to `NAME` + `VERSION` if `PRETTY_NAME` is absent.
    fn extract_pretty_name(os_release: &str) -> Option<String> {
        let mut pretty_name = None;
        let mut name = None;
        let mut version = None;

        for line in os_release.lines() {
            let line = line.trim();
            let unquote = |v: &str| {
                let v = v.trim().trim_matches('"').trim_matches('\'').trim();
                (!v.is_empty()).then(|| v.to_string())
            };
            if let Some(val) = line.strip_prefix("PRETTY_NAME=") {
                pretty_name = unquote(val);
            } else if let Some(val) = line.strip_prefix("NAME=") {
                name = unquote(val);
            } else if let Some(val) = line.strip_prefix("VERSION=") {
                version = unquote(val);
            }
        }

        pretty_name
            .or_else(|| name.map(|n| version.map_or_else(|| n.clone(), |v| format!("{n} {v}"))))
    }
}
