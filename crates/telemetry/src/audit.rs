//! Audit samples: one JSON document per line in an append-only file.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Envelope written around every sample.
#[derive(Debug, Serialize)]
struct AuditRecord<'a, T: Serialize> {
    kind: &'a str,
    recorded_at: DateTime<Utc>,
    payload: &'a T,
}

/// Append a sample payload to the audit file, if one is configured.
///
/// # Arguments
/// * `path` - Path to the audit file; `None` disables auditing
/// * `kind` - Short label for the sample (e.g. "route_plan")
/// * `payload` - Serializable payload to write
pub fn write_audit_sample<P: AsRef<Path>, T: Serialize>(
    path: Option<P>,
    kind: &str,
    payload: &T,
) -> anyhow::Result<()> {
    if let Some(audit_path) = path {
        let record = AuditRecord {
            kind,
            recorded_at: Utc::now(),
            payload,
        };
        let json = serde_json::to_string(&record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&audit_path)?;
        writeln!(file, "{}", json)?;
        info!("Wrote {} audit sample to {:?}", kind, audit_path.as_ref());
    }
    Ok(())
}
