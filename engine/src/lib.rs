use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod dispatch;
pub mod guard;
pub mod partition;

/// Faults raised while driving the external annotation engine. All of these
/// abort the current run; per-unit engine failures are reported through
/// [`dispatch::JobReport`] instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("metamap command not found; make sure MetaMap is installed and METAMAP_PATH points at it")]
    NotInstalled,
    #[error("failed to start the tagger server")]
    TaggerStartFailed,
    #[error("{0} tagger server instances are running; cannot tell which one serves requests")]
    TaggerAmbiguous(usize),
    #[error("work unit i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Engine invocation settings, read from the environment once at startup.
///
/// `METAMAP_PATH` points at the MetaMap install directory; without it the
/// binaries are resolved through `PATH`. `METAMAP_SEM_TYPES` and
/// `METAMAP_DATA_SOURCES` are comma-separated restriction lists passed
/// through as `-J` / `-R` flags.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub metamap_bin: PathBuf,
    pub tagger_ctl: PathBuf,
    pub sem_types: Vec<String>,
    pub data_sources: Vec<String>,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let root = std::env::var("METAMAP_PATH").ok();
        let resolve = |bin: &str| match &root {
            Some(dir) => Path::new(dir).join(bin),
            None => PathBuf::from(bin),
        };
        let cfg = Self {
            metamap_bin: resolve("metamap"),
            tagger_ctl: resolve("skrmedpostctl"),
            sem_types: env_list("METAMAP_SEM_TYPES"),
            data_sources: env_list("METAMAP_DATA_SOURCES"),
        };
        tracing::debug!(
            metamap = %cfg.metamap_bin.display(),
            sem_types = ?cfg.sem_types,
            data_sources = ?cfg.data_sources,
            "engine configured"
        );
        cfg
    }
}

fn env_list(var: &str) -> Vec<String> {
    std::env::var(var)
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
