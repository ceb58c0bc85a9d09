use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Checkpoint, CheckpointMetadata, Checkpointer, HistoryCheckpointer, WorkflowError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub seq: u64,
    pub created_at: String,
    pub checkpoint: Checkpoint,
}

/// Append-only JSONL store, one file per session. Survives process restarts
/// so a paused session can be resumed by a different process.
#[derive(Clone, Debug)]
pub struct FileCheckpointer {
    base_dir: PathBuf,
}

fn io_err(err: impl std::fmt::Display) -> WorkflowError {
    WorkflowError::Checkpoint(err.to_string())
}

impl FileCheckpointer {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    fn sanitize_session_id(session_id: &str) -> String {
        let mut out = String::with_capacity(session_id.len());
        for ch in session_id.chars() {
            match ch {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => out.push('_'),
                c if c.is_control() => {}
                c => out.push(c),
            }
        }
        let trimmed = out.trim_matches(|c: char| c == '.' || c.is_whitespace() || c == '_');
        if trimmed.is_empty() {
            let mut hasher = DefaultHasher::new();
            session_id.hash(&mut hasher);
            return format!("session-{:08x}", hasher.finish());
        }
        trimmed.to_string()
    }

    pub fn session_path(&self, session_id: &str) -> PathBuf {
        let filename = format!("{}.jsonl", Self::sanitize_session_id(session_id));
        self.base_dir.join(filename)
    }

    fn read_records(&self, session_id: &str) -> Result<Vec<CheckpointRecord>, WorkflowError> {
        let path = self.session_path(session_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&path).map_err(io_err)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(io_err)?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line).map_err(io_err)?);
        }
        Ok(records)
    }
}

#[async_trait::async_trait]
impl Checkpointer for FileCheckpointer {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), WorkflowError> {
        fs::create_dir_all(&self.base_dir).map_err(io_err)?;

        let seq = self
            .read_records(&checkpoint.session_id)?
            .last()
            .map(|record| record.seq + 1)
            .unwrap_or(1);
        let record = CheckpointRecord {
            seq,
            created_at: checkpoint.created_at.clone(),
            checkpoint: checkpoint.clone(),
        };
        let line = serde_json::to_string(&record).map_err(io_err)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.session_path(&checkpoint.session_id))
            .map_err(io_err)?;
        file.write_all(format!("{line}\n").as_bytes())
            .map_err(io_err)?;
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, WorkflowError> {
        Ok(self
            .read_records(session_id)?
            .pop()
            .map(|record| record.checkpoint))
    }

    async fn discard(&self, session_id: &str) -> Result<(), WorkflowError> {
        let path = self.session_path(session_id);
        if path.exists() {
            fs::remove_file(&path).map_err(io_err)?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl HistoryCheckpointer for FileCheckpointer {
    async fn list_checkpoints(
        &self,
        session_id: &str,
    ) -> Result<Vec<CheckpointMetadata>, WorkflowError> {
        Ok(self
            .read_records(session_id)?
            .into_iter()
            .map(|record| CheckpointMetadata {
                seq: record.seq,
                stage: record.checkpoint.stage,
                created_at: record.created_at,
            })
            .collect())
    }
}
