use cuimap_core::Document;
use std::time::Duration;
use thiserror::Error;

pub mod omim;
pub mod pubmed;

/// Per-source fetch faults. All of them are non-fatal: a failing source
/// degrades to an empty contribution and never aborts the other source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Literature source settings, read from the environment once at startup.
/// A missing API key disables that source (with a warning) instead of
/// failing the process.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub pubmed_key: Option<String>,
    pub omim_key: Option<String>,
    pub pubmed_timeout: Duration,
    pub omim_timeout: Duration,
    /// Maximum number of articles requested from PubMed (search and fetch).
    pub ret_max: u32,
}

impl FetchConfig {
    pub fn from_env() -> Self {
        let key = |var: &str| {
            let found = std::env::var(var).ok().filter(|v| !v.is_empty());
            if found.is_none() {
                tracing::warn!(%var, "api key not set; that source is disabled");
            }
            found
        };
        let timeout = |var: &str| {
            let secs = std::env::var(var)
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(3.5);
            Duration::from_secs_f64(secs)
        };
        let ret_max = std::env::var("PUBMED_RET_MAX")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50);
        Self {
            pubmed_key: key("PUBMED_KEY"),
            omim_key: key("OMIM_KEY"),
            pubmed_timeout: timeout("PUBMED_TIMEOUT"),
            omim_timeout: timeout("OMIM_TIMEOUT"),
            ret_max,
        }
    }
}

/// Query both literature sources concurrently and combine whatever
/// succeeded: PubMed articles first, then the OMIM variant entry. Each
/// side's failure only costs that side's documents.
pub async fn fetch_all(client: &reqwest::Client, cfg: &FetchConfig, term: &str) -> Vec<Document> {
    let (pm_client, pm_cfg, pm_term) = (client.clone(), cfg.clone(), term.to_string());
    let pubmed =
        tokio::spawn(async move { pubmed::get_pubmed(&pm_client, &pm_cfg, &pm_term).await });
    let (om_client, om_cfg, om_term) = (client.clone(), cfg.clone(), term.to_string());
    let omim = tokio::spawn(async move { omim::get_omim(&om_client, &om_cfg, &om_term).await });

    let mut docs = match pubmed.await {
        Ok(Ok(articles)) => articles,
        Ok(Err(err)) => {
            tracing::error!(%err, "pubmed query failed");
            Vec::new()
        }
        Err(err) => {
            tracing::error!(%err, "pubmed task panicked");
            Vec::new()
        }
    };
    match omim.await {
        Ok(Ok(Some(doc))) => docs.push(doc),
        Ok(Ok(None)) => tracing::debug!("omim: no result"),
        Ok(Err(err)) => tracing::error!(%err, "omim query failed"),
        Err(err) => tracing::error!(%err, "omim task panicked"),
    }
    docs
}
