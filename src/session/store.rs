use crate::config::Settings;
use crate::session::{StageStateMeta, TranscriptMeta, SCHEMA_VERSION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.json";
const TRANSCRIPT_FILE: &str = "transcript.json";
const STAGE_STATE_FILE: &str = "stage_state.json";

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("USERPROFILE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn data_dir() -> PathBuf {
    home_dir().join(".gradus")
}

fn slot_path(file: &str) -> PathBuf {
    data_dir().join(file)
}

fn ensure_data_dir() -> io::Result<PathBuf> {
    let dir = data_dir();
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let data = fs::read(path).map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    serde_json::from_slice(&data).map_err(|err| format!("failed to parse {}: {err}", path.display()))
}

fn write_json<T: Serialize>(file: &str, value: &T) -> io::Result<()> {
    let dir = ensure_data_dir()?;
    let final_path = dir.join(file);
    let tmp_path = dir.join(format!("{file}.tmp"));
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;

    fs::write(&tmp_path, bytes)?;
    match fs::rename(&tmp_path, &final_path) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if final_path.exists() {
                fs::remove_file(&final_path)?;
                fs::rename(&tmp_path, &final_path)?;
                Ok(())
            } else {
                Err(rename_err)
            }
        }
    }
}

fn remove_slot(file: &str) -> io::Result<()> {
    match fs::remove_file(slot_path(file)) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

// A missing slot is "no prior state", not a warning; a present-but-unreadable
// slot loads as absent with a warning for the diagnostics log.
fn load_slot<T, F>(file: &str, read: F) -> (Option<T>, Option<String>)
where
    F: Fn(&Path) -> Result<T, String>,
{
    let path = slot_path(file);
    if !path.exists() {
        return (None, None);
    }
    match read(&path) {
        Ok(value) => (Some(value), None),
        Err(warning) => {
            tracing::warn!(target: "gradus::store", %warning, "slot load failed");
            (None, Some(warning))
        }
    }
}

fn read_transcript_file(path: &Path) -> Result<TranscriptMeta, String> {
    let meta: TranscriptMeta = read_json(path)?;
    if meta.schema_version != SCHEMA_VERSION {
        return Err(format!(
            "unknown schema_version in {}: {}",
            path.display(),
            meta.schema_version
        ));
    }
    Ok(meta)
}

fn read_stage_state_file(path: &Path) -> Result<StageStateMeta, String> {
    let meta: StageStateMeta = read_json(path)?;
    if meta.schema_version != SCHEMA_VERSION {
        return Err(format!(
            "unknown schema_version in {}: {}",
            path.display(),
            meta.schema_version
        ));
    }
    Ok(meta)
}

pub fn load_settings() -> (Option<Settings>, Option<String>) {
    load_slot(SETTINGS_FILE, read_json::<Settings>)
}

pub fn save_settings(settings: &Settings) -> io::Result<()> {
    write_json(SETTINGS_FILE, settings)
}

pub fn load_transcript() -> (Option<TranscriptMeta>, Option<String>) {
    load_slot(TRANSCRIPT_FILE, read_transcript_file)
}

pub fn save_transcript(meta: &TranscriptMeta) -> io::Result<()> {
    write_json(TRANSCRIPT_FILE, meta)
}

pub fn clear_transcript() -> io::Result<()> {
    remove_slot(TRANSCRIPT_FILE)
}

pub fn load_stage_state() -> (Option<StageStateMeta>, Option<String>) {
    load_slot(STAGE_STATE_FILE, read_stage_state_file)
}

pub fn save_stage_state(meta: &StageStateMeta) -> io::Result<()> {
    write_json(STAGE_STATE_FILE, meta)
}

pub fn clear_stage_state() -> io::Result<()> {
    remove_slot(STAGE_STATE_FILE)
}

#[cfg(test)]
mod tests {
    use super::{read_json, read_stage_state_file, read_transcript_file};
    use crate::config::Settings;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "gradus_store_{prefix}_{}_{}.json",
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn read_json_round_trips_settings() {
        let path = temp_file("settings");
        let settings = Settings {
            base_url: "http://localhost:8080/v1".to_string(),
            model: "qwen3".to_string(),
            api_key: "sk-local+/=".to_string(),
        };
        let data = serde_json::to_vec_pretty(&settings).expect("settings should serialize");
        fs::write(&path, data).expect("settings fixture should write");

        let loaded: Settings = read_json(&path).expect("settings should load");
        assert_eq!(loaded, settings);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn read_json_reports_corrupt_slots() {
        let path = temp_file("corrupt");
        fs::write(&path, b"{not json").expect("corrupt fixture should write");

        let error = read_json::<Settings>(&path).expect_err("corrupt slot should fail");
        assert!(error.contains("failed to parse"));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn read_transcript_file_rejects_unknown_schema() {
        let path = temp_file("transcript_schema");
        let data = r#"{
  "schema_version": 99,
  "started_at": "1",
  "messages": []
}"#;
        fs::write(&path, data).expect("transcript fixture should write");

        let error = read_transcript_file(&path).expect_err("unknown schema should fail");
        assert!(error.contains("unknown schema_version"));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn read_transcript_file_loads_current_schema() {
        let path = temp_file("transcript");
        let data = r#"{
  "schema_version": 1,
  "started_at": "1722000000",
  "messages": [
    {"role": "system", "content": "instruction"},
    {"role": "user", "content": "hello"}
  ]
}"#;
        fs::write(&path, data).expect("transcript fixture should write");

        let meta = read_transcript_file(&path).expect("transcript should load");
        assert_eq!(meta.messages.len(), 2);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn read_stage_state_file_round_trips_text() {
        let path = temp_file("stage_state");
        let data = r#"{
  "schema_version": 1,
  "text": "STATE:\n  progress: {current_stage: 2, stages_total: 8}"
}"#;
        fs::write(&path, data).expect("stage state fixture should write");

        let meta = read_stage_state_file(&path).expect("stage state should load");
        assert!(meta.text.starts_with("STATE:"));

        let _ = fs::remove_file(path);
    }
}
