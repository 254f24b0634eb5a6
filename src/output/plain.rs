//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::inventory::{AuthStatus, Inventory};
use console::{style, Style};
use std::io::{self, Write};

const RULE: &str = "═════════════════════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "─────────────────────────────────────────────────────────────────────────────";

/// Write the inventory as a table.
pub fn write_table(inventory: &Inventory, out: &mut impl Write) -> io::Result<()> {
    // Header
    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(
        out,
        "                        {} Camera Inventory",
        style("camscout").cyan().bold()
    )?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    // Statistics
    writeln!(
        out,
        "  {} {} device(s) in {:.2}s",
        style("Statistics:").bold(),
        inventory.cameras.len(),
        inventory.duration_ms() as f64 / 1000.0
    )?;
    writeln!(
        out,
        "              {} authenticated, {} failed, {} skipped",
        style(inventory.authenticated()).green().bold(),
        style(count(inventory, AuthStatus::Failed)).red(),
        style(count(inventory, AuthStatus::Skipped)).yellow()
    )?;
    writeln!(out)?;

    if inventory.cameras.is_empty() {
        writeln!(out, "  {}", style("No devices to display.").dim())?;
    } else {
        writeln!(out, "  {}", style(THIN_RULE).dim())?;
        writeln!(
            out,
            "  {:<15}  {:<16}  {:<18}  {:<13}  {:<3}  {}",
            style("IP").bold(),
            style("MANUFACTURER").bold(),
            style("MODEL").bold(),
            style("AUTH").bold(),
            style("PTZ").bold(),
            style("STREAMS").bold()
        )?;
        writeln!(out, "  {}", style(THIN_RULE).dim())?;

        for camera in &inventory.cameras {
            let auth_style = match camera.auth_status {
                AuthStatus::Authenticated => Style::new().green().bold(),
                AuthStatus::Failed => Style::new().red(),
                AuthStatus::Skipped => Style::new().yellow(),
            };
            let ptz = if camera.ptz.supported { "yes" } else { "no" };

            writeln!(
                out,
                "  {:<15}  {:<16}  {:<18}  {:<13}  {:<3}  {}",
                camera.ip.to_string(),
                truncate_string(camera.manufacturer(), 16),
                truncate_string(camera.model(), 18),
                auth_style.apply_to(camera.auth_status.to_string()),
                ptz,
                camera.stream_count()
            )?;
        }

        writeln!(out, "  {}", style(THIN_RULE).dim())?;
    }

    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    Ok(())
}

fn count(inventory: &Inventory, status: AuthStatus) -> usize {
    inventory
        .cameras
        .iter()
        .filter(|c| c.auth_status == status)
        .count()
}

/// Print a header before discovery begins.
pub fn print_scan_header(mode: &str, subnet: Option<&str>) {
    eprintln!();
    eprintln!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("camscout").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{} Discovery mode: {}", style("•").dim(), style(mode).yellow());
    if let Some(subnet) = subnet {
        eprintln!(
            "{} Subnet: {}",
            style("•").dim(),
            style(subnet).white().bold()
        );
    }
    eprintln!();
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    eprintln!("{} {}", style("✓").green().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    eprintln!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Truncate a string to a maximum number of characters, adding an
/// ellipsis if truncated.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
