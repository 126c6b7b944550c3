//! Human-readable snapshot rendering.

use std::fmt::Write as _;

use vpsmon_core::MetricsSnapshot;

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Width of the usage bars
const BAR_WIDTH: usize = 20;

/// ANSI styling, or nothing when colors are disabled
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    /// Creates a palette; `enabled = false` renders plain text
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Returns true if ANSI styling is emitted
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        self.enabled
    }

    const fn pick(self, code: &'static str) -> &'static str {
        if self.enabled { code } else { "" }
    }

    const fn bold(self) -> &'static str {
        self.pick(BOLD)
    }

    const fn cyan(self) -> &'static str {
        self.pick(CYAN)
    }

    const fn reset(self) -> &'static str {
        self.pick(RESET)
    }

    /// Green below 60%, yellow below 85%, red above
    fn level(self, percent: f64) -> &'static str {
        if percent >= 85.0 {
            self.pick(RED)
        } else if percent >= 60.0 {
            self.pick(YELLOW)
        } else {
            self.pick(GREEN)
        }
    }
}

/// Renders `percent` as a fixed-width bar
fn bar(percent: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

/// Renders a snapshot as a multi-line summary
#[must_use]
pub fn format_summary(snapshot: &MetricsSnapshot, palette: Palette) -> String {
    let (b, c, r) = (palette.bold(), palette.cyan(), palette.reset());
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{b}{}{r}  {c}{}{r}",
        snapshot.system.os,
        snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(
        out,
        "{} ({} cores, {} MHz)",
        snapshot.system.cpu_model, snapshot.system.total_cores, snapshot.cpu.speed
    );

    let cpu = snapshot.cpu.usage;
    let _ = writeln!(
        out,
        "\n{b}CPU{r}     {}{} {cpu:>6.2}%{r}",
        palette.level(cpu),
        bar(cpu)
    );
    let shown = usize::try_from(snapshot.system.max_cores).unwrap_or(usize::MAX);
    for core in snapshot.cpu.cores.iter().take(shown) {
        let _ = writeln!(
            out,
            "  {:<6} {}{} {:>6.2}%{r}  usr {:.2}  sys {:.2}  io {:.2}",
            core.core,
            palette.level(core.usage),
            bar(core.usage),
            core.usage,
            core.user,
            core.system,
            core.iowait
        );
    }
    if snapshot.cpu.cores.len() > shown {
        let _ = writeln!(out, "  ... {} more", snapshot.cpu.cores.len() - shown);
    }

    let memory = &snapshot.memory;
    let _ = writeln!(
        out,
        "{b}Memory{r}  {}{} {:>6.1}%{r}  {} / {} MB ({} MB free)",
        palette.level(memory.usage_percent),
        bar(memory.usage_percent),
        memory.usage_percent,
        memory.used,
        memory.total,
        memory.free
    );

    let disk = &snapshot.disk;
    let disk_percent: f64 = disk.usage.trim_end_matches('%').parse().unwrap_or(0.0);
    let _ = writeln!(
        out,
        "{b}Disk /{r}  {}{} {:>7}{r}  {} / {} ({} free)",
        palette.level(disk_percent),
        bar(disk_percent),
        disk.usage,
        disk.used,
        disk.total,
        disk.free
    );

    if !snapshot.processes.is_empty() {
        let _ = writeln!(
            out,
            "\n{b}{:<12} {:>8} {:>6} {:>6}  COMMAND{r}",
            "USER", "PID", "%CPU", "%MEM"
        );
        for process in &snapshot.processes {
            let _ = writeln!(
                out,
                "{:<12} {:>8} {:>6.1} {:>6.1}  {}",
                process.user, process.pid, process.cpu, process.memory, process.command
            );
        }
    }

    out
}
