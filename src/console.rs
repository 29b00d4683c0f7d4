//! Live console rendering.
//!
//! Turns the monitor's event stream into colorized, timestamped lines on
//! stdout. Quiet-mode updates rewrite a single line in place instead of
//! scrolling; diagnostics go to stderr via tracing, so stdout stays clean
//! for the session itself.

use std::io::{self, Stdout, Write};

use chrono::Local;
use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{Clear, ClearType},
};

use crate::events::MonitorEvent;
use crate::stats::StatsSnapshot;

/// ASCII BEL; the terminal decides what "bell" means.
const BELL: &[u8] = b"\x07";

/// Renderer for the monitor event stream. One instance per session.
pub struct Console {
    out: Stdout,
    mute: bool,
    // True while the quiet-mode status line is open (no trailing newline).
    quiet_line_open: bool,
}

impl Console {
    pub fn new(mute: bool) -> Self {
        Self {
            out: io::stdout(),
            mute,
            quiet_line_open: false,
        }
    }

    /// Render one event. Every event kind produces visible output.
    pub fn render(&mut self, event: &MonitorEvent) -> io::Result<()> {
        match event {
            MonitorEvent::Success {
                target,
                latency_ms,
                ttl,
                critical,
            } => {
                self.close_quiet_line()?;
                let color = if *critical { Color::Red } else { Color::Green };
                self.line(
                    color,
                    false,
                    &format!("Reply from {target}: time={latency_ms}ms ttl={ttl}"),
                )?;
            }
            MonitorEvent::Failure {
                target, message, ..
            } => {
                self.close_quiet_line()?;
                self.line(Color::Red, false, &format!("{target}: {message}"))?;
                self.bell()?;
            }
            MonitorEvent::QuietUpdate { consecutive_losses } => {
                // Rewrite in place so a long outage stays one line.
                queue!(
                    self.out,
                    MoveToColumn(0),
                    Clear(ClearType::CurrentLine),
                    SetForegroundColor(Color::DarkRed),
                    Print(format!(
                        "[{}] no reply for {consecutive_losses} consecutive probes",
                        timestamp()
                    )),
                    ResetColor
                )?;
                self.out.flush()?;
                self.quiet_line_open = true;
            }
            MonitorEvent::Stats(snapshot) => {
                self.close_quiet_line()?;
                self.line(Color::Cyan, false, &format_stats(snapshot))?;
            }
            MonitorEvent::Failover { from, to } => {
                self.close_quiet_line()?;
                self.line(
                    Color::Yellow,
                    true,
                    &format!("{from} unreachable, switching to fallback {to}"),
                )?;
                self.bell()?;
            }
            MonitorEvent::Failback { to } => {
                self.close_quiet_line()?;
                self.line(
                    Color::Green,
                    true,
                    &format!("primary recovered, switching back to {to}"),
                )?;
            }
            MonitorEvent::Recovered {
                target,
                after_losses,
            } => {
                self.close_quiet_line()?;
                self.line(
                    Color::Green,
                    true,
                    &format!("connection to {target} restored after {after_losses} lost probes"),
                )?;
                self.bell()?;
            }
        }
        Ok(())
    }

    /// Final aggregate line, printed once at shutdown.
    pub fn render_summary(&mut self, snapshot: &StatsSnapshot) -> io::Result<()> {
        self.close_quiet_line()?;
        self.line(Color::Cyan, true, &format!("session {}", format_stats(snapshot)))
    }

    fn line(&mut self, color: Color, bold: bool, text: &str) -> io::Result<()> {
        queue!(self.out, SetForegroundColor(color))?;
        if bold {
            queue!(self.out, SetAttribute(Attribute::Bold))?;
        }
        queue!(
            self.out,
            Print(format!("[{}] {text}", timestamp())),
            SetAttribute(Attribute::Reset),
            ResetColor,
            Print("\n")
        )?;
        self.out.flush()
    }

    // The quiet line has no newline yet; terminate it before normal lines.
    fn close_quiet_line(&mut self) -> io::Result<()> {
        if self.quiet_line_open {
            queue!(self.out, Print("\n"))?;
            self.quiet_line_open = false;
        }
        Ok(())
    }

    fn bell(&mut self) -> io::Result<()> {
        if !self.mute {
            self.out.write_all(BELL)?;
            self.out.flush()?;
        }
        Ok(())
    }
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

fn format_stats(snapshot: &StatsSnapshot) -> String {
    let avg = snapshot
        .average_ms
        .map(|ms| format!("{ms:.2}ms"))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "stats: {} sent, {} lost ({:.2}% loss), avg {avg}",
        snapshot.total, snapshot.lost, snapshot.loss_rate_percent
    )
}
