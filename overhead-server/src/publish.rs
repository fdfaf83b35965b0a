//! Atomic publication of the alert record.
//!
//! The record is written to a sibling temp file and renamed over the target,
//! so readers see either the previous document or the new one.

use std::path::{Path, PathBuf};

use overhead_core::{AlertRecord, Result};

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

pub async fn write_alert(path: &Path, record: &AlertRecord) -> Result<()> {
    let body = serde_json::to_vec(record)?;
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, &body).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use overhead_core::AlertInputs;

    fn record(temperature_c: Option<f64>) -> AlertRecord {
        AlertRecord::build(AlertInputs {
            now: chrono::Utc::now(),
            display: true,
            refresh: false,
            refresh_interval_ms: 10_000,
            png_url: "http://127.0.0.1:8080/flight_card.png",
            subject: None,
            temperature_c,
        })
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let tmp = temp_path(Path::new("/srv/html/flight_alert.json"));
        assert_eq!(tmp, PathBuf::from("/srv/html/flight_alert.json.tmp"));
    }

    #[tokio::test]
    async fn test_write_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alert.json");

        write_alert(&path, &record(Some(18.0))).await.unwrap();
        write_alert(&path, &record(Some(19.5))).await.unwrap();

        let back: AlertRecord = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back.temperature_c, Some(19.5));
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_missing_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("alert.json");
        assert!(write_alert(&path, &record(None)).await.is_err());
    }

    #[tokio::test]
    async fn test_interrupted_write_leaves_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alert.json");
        write_alert(&path, &record(Some(18.0))).await.unwrap();

        // shutdown dropped a tick halfway through the temp write
        std::fs::write(temp_path(&path), b"{\"display\": tru").unwrap();
        let back: AlertRecord = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back.temperature_c, Some(18.0));

        // the next run overwrites the stray temp file
        write_alert(&path, &record(Some(20.0))).await.unwrap();
        let back: AlertRecord = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back.temperature_c, Some(20.0));
        assert!(!temp_path(&path).exists());
    }
}
