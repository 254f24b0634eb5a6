//! Output formatting module.
//!
//! Renders the camera inventory as a table, JSON or CSV, and exports it to
//! a JSON file.

mod csv_format;
mod json_format;
mod plain;

pub use csv_format::write_csv;
pub use json_format::{export_json, write_json};
pub use plain::{
    print_error, print_info, print_scan_header, print_success, print_warning, write_table,
};

use crate::cli::OutputFormat;
use crate::inventory::Inventory;
use std::io::{self, Write};

/// Render the inventory into `out` according to `format`.
pub fn write_inventory(
    inventory: &Inventory,
    format: OutputFormat,
    out: &mut impl Write,
) -> io::Result<()> {
    match format {
        OutputFormat::Table => write_table(inventory, out),
        OutputFormat::Json => write_json(&inventory.cameras, out),
        OutputFormat::Csv => write_csv(&inventory.cameras, out),
    }
}

/// Format and print the inventory to stdout.
pub fn print_inventory(inventory: &Inventory, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_inventory(inventory, format, &mut out)?;
    out.flush()
}
