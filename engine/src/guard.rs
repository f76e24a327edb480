use crate::{EngineConfig, EngineError};
use std::io::ErrorKind;
use tokio::process::Command;

/// Health of the long-lived part-of-speech tagger the engine depends on,
/// derived from a structured process probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaggerStatus {
    Absent,
    Running,
    /// More than one instance is up; it is impossible to tell which one will
    /// serve requests, so the run must fail until an operator intervenes.
    Ambiguous(usize),
}

impl TaggerStatus {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => TaggerStatus::Absent,
            1 => TaggerStatus::Running,
            n => TaggerStatus::Ambiguous(n),
        }
    }
}

/// Verify the engine is installed and its tagger server is up, starting the
/// tagger if needed. Invoked once per annotation run, before any dispatch.
pub async fn ensure_ready(cfg: &EngineConfig) -> Result<(), EngineError> {
    probe_install(cfg).await?;
    match TaggerStatus::from_count(tagger_count().await?) {
        TaggerStatus::Running => {
            tracing::debug!("tagger server already running");
            Ok(())
        }
        TaggerStatus::Absent => start_tagger(cfg).await,
        TaggerStatus::Ambiguous(n) => Err(EngineError::TaggerAmbiguous(n)),
    }
}

async fn probe_install(cfg: &EngineConfig) -> Result<(), EngineError> {
    match Command::new(&cfg.metamap_bin).arg("--help").output().await {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(EngineError::NotInstalled),
        Err(err) => Err(EngineError::Io(err)),
    }
}

/// Count running tagger instances. `pgrep` exits non-zero when nothing
/// matches, which is a count of zero rather than a failure.
async fn tagger_count() -> Result<usize, EngineError> {
    let out = Command::new("pgrep")
        .args(["-f", "-c", "taggerServer"])
        .output()
        .await?;
    let text = String::from_utf8_lossy(&out.stdout);
    Ok(text.trim().parse().unwrap_or(0))
}

async fn start_tagger(cfg: &EngineConfig) -> Result<(), EngineError> {
    tracing::info!("starting tagger server");
    let out = Command::new(&cfg.tagger_ctl)
        .arg("start")
        .output()
        .await
        .map_err(|err| match err.kind() {
            ErrorKind::NotFound => EngineError::NotInstalled,
            _ => EngineError::Io(err),
        })?;
    let stdout = String::from_utf8_lossy(&out.stdout);
    if stdout.contains("started") {
        Ok(())
    } else {
        tracing::error!(output = %stdout.trim(), "tagger start was not acknowledged");
        Err(EngineError::TaggerStartFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_probe_count() {
        assert_eq!(TaggerStatus::from_count(0), TaggerStatus::Absent);
        assert_eq!(TaggerStatus::from_count(1), TaggerStatus::Running);
        assert_eq!(TaggerStatus::from_count(2), TaggerStatus::Ambiguous(2));
        assert_eq!(TaggerStatus::from_count(7), TaggerStatus::Ambiguous(7));
    }

    #[tokio::test]
    async fn missing_binary_is_not_installed() {
        let cfg = EngineConfig {
            metamap_bin: "/definitely/not/a/real/metamap".into(),
            tagger_ctl: "/definitely/not/a/real/skrmedpostctl".into(),
            sem_types: vec![],
            data_sources: vec![],
        };
        let err = probe_install(&cfg).await.unwrap_err();
        assert!(matches!(err, EngineError::NotInstalled));
    }
}
