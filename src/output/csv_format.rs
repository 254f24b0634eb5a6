//! CSV output formatting.

use crate::inventory::CameraRecord;
use std::io::{self, Write};

/// Write one row per record.
pub fn write_csv(cameras: &[CameraRecord], out: &mut impl Write) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    // Write header
    wtr.write_record([
        "ip",
        "auth_status",
        "credential_tier",
        "username",
        "manufacturer",
        "model",
        "firmware_version",
        "serial_number",
        "ptz",
        "streams",
        "rtsp_uris",
        "inspection_status",
    ])?;

    for camera in cameras {
        let uris: Vec<&str> = camera
            .profiles
            .iter()
            .filter_map(|p| p.rtsp_uri.as_deref())
            .collect();

        wtr.write_record([
            camera.ip.to_string().as_str(),
            &camera.auth_status.to_string(),
            &camera
                .credential_tier
                .map_or(String::new(), |t| t.to_string()),
            camera.username.as_deref().unwrap_or(""),
            camera.identity.manufacturer.as_deref().unwrap_or(""),
            camera.identity.model.as_deref().unwrap_or(""),
            camera.identity.firmware_version.as_deref().unwrap_or(""),
            camera.identity.serial_number.as_deref().unwrap_or(""),
            if camera.ptz.supported { "yes" } else { "no" },
            &camera.stream_count().to_string(),
            &uris.join(" "),
            &camera.inspection_status.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
