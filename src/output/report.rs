use std::path::Path;

use crate::error::OrchestratorError;

/// Serialize `value` as pretty JSON and write it to `path` (spec.md §6:
/// `execution_report.json` is the single normative output artifact).
/// Generic so the same helper also backs any future secondary report
/// without a bespoke writer per shape.
pub async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), OrchestratorError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[tokio::test]
    async fn writes_pretty_json_to_disk() {
        let dir = std::env::temp_dir().join(format!("vorch-report-test-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("execution_report.json");

        write_json(&path, &Sample { name: "scan".into(), count: 3 }).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.contains("\"name\""));
        assert!(contents.contains("\"count\": 3"));
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
