use fs_err as fs;
use serde::Serialize;
use serde_json::to_string_pretty;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Diagnostics go to stderr so the conversation on stdout stays clean.
pub fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), default_level))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

pub struct SavedPaths {
    pub request: PathBuf,
    pub response: PathBuf,
}

/// Request/response pairs of one session, numbered in call order.
pub struct Transcript {
    dir: PathBuf,
    enabled: bool,
    seq: usize,
}

pub fn session_dir(root: &Path, session: Uuid) -> PathBuf {
    root.join(".fortune").join("tx").join(session.to_string())
}

impl Transcript {
    pub fn new(root: &Path, session: Uuid, enabled: bool) -> Self {
        let dir = session_dir(root, session);
        if enabled {
            tracing::debug!(dir = %dir.display(), "transcript enabled");
        }
        Self { dir, enabled, seq: 0 }
    }

    pub fn disabled() -> Self {
        Self { dir: PathBuf::new(), enabled: false, seq: 0 }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_stage<Req: Serialize, Resp: Serialize>(
        &mut self,
        stage: &str,
        req: &Req,
        resp: &Resp,
    ) -> anyhow::Result<Option<SavedPaths>> {
        if !self.enabled {
            return Ok(None);
        }
        fs::create_dir_all(&self.dir)?;
        self.seq += 1;

        let request = self.dir.join(format!("{:02}-{stage}.request.json", self.seq));
        fs::write(&request, to_string_pretty(req)?)?;
        let response = self.dir.join(format!("{:02}-{stage}.response.json", self.seq));
        fs::write(&response, to_string_pretty(resp)?)?;

        tracing::debug!(stage, request = %request.display(), "transcript stage saved");
        Ok(Some(SavedPaths { request, response }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stages_are_numbered_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let session = Uuid::new_v4();
        let mut t = Transcript::new(tmp.path(), session, true);
        let first = t.save_stage("prophecy", &json!({"a": 1}), &json!({"b": 2})).unwrap().unwrap();
        let second = t.save_stage("card", &json!({}), &json!({})).unwrap().unwrap();
        assert!(first.request.ends_with("01-prophecy.request.json"));
        assert!(second.response.ends_with("02-card.response.json"));
        assert!(t.dir().starts_with(tmp.path().join(".fortune").join("tx")));
        let saved = std::fs::read_to_string(&first.response).unwrap();
        assert!(saved.contains("\"b\": 2"));
    }

    #[test]
    fn disabled_transcript_writes_nothing() {
        let mut t = Transcript::disabled();
        assert!(t.save_stage("x", &json!({}), &json!({})).unwrap().is_none());
    }
}
