/// Export of scan results for callers that need a file or wire format.
///
/// The engine itself never encodes anything; these helpers exist so every
/// frontend writes the same shapes.
use crate::model::{ScanStatus, Threat};
use std::io::Write;

/// Pretty-printed JSON of a status snapshot, newline terminated.
pub fn write_json<W: Write>(status: &ScanStatus, mut writer: W) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(&mut writer, status)?;
    writer.write_all(b"\n").map_err(serde_json::Error::io)
}

/// One CSV row per threat: `path,type,signature,detected_at` (RFC 3339).
///
/// The header row is always written, even for an empty list.
pub fn write_threats_csv<W: Write>(threats: &[Threat], writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["path", "type", "signature", "detected_at"])?;
    for threat in threats {
        wtr.write_record([
            threat.path.as_str(),
            threat.threat_type.as_str(),
            threat.signature.as_str(),
            threat.detected_at.to_rfc3339().as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
