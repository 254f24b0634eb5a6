//! JSON output formatting.

use crate::inventory::CameraRecord;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::{error, info};

/// Write the records as a pretty-printed JSON array.
pub fn write_json(cameras: &[CameraRecord], out: &mut impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, cameras)?;
    writeln!(out)
}

/// Export the records to `path`.
///
/// A failed export is logged and reported through the return value; it
/// never aborts the run.
pub fn export_json(cameras: &[CameraRecord], path: &Path) -> bool {
    let result = File::create(path).and_then(|file| {
        let mut out = BufWriter::new(file);
        write_json(cameras, &mut out)?;
        out.flush()
    });

    match result {
        Ok(()) => {
            info!(path = %path.display(), cameras = cameras.len(), "Inventory exported");
            true
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to export inventory");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{AuthStatus, CameraRecord};
    use std::net::Ipv4Addr;

    fn records() -> Vec<CameraRecord> {
        vec![
            CameraRecord::placeholder(Ipv4Addr::new(192, 168, 1, 10), AuthStatus::Failed),
            CameraRecord::placeholder(Ipv4Addr::new(192, 168, 1, 11), AuthStatus::Skipped),
        ]
    }

    #[test]
    fn test_export_writes_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cameras.json");

        assert!(export_json(&records(), &path));

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<CameraRecord> = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, records());
        assert!(!written.contains("password"));
    }

    #[test]
    fn test_export_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("cameras.json");

        assert!(!export_json(&records(), &path));
    }
}
