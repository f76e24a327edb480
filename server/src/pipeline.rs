use crate::AppState;
use anyhow::{Context, Result};
use cuimap_core::aggregate::aggregate;
use cuimap_core::{ConceptMatch, Document};
use cuimap_engine::dispatch::{dispatch, JobOutcome};
use cuimap_engine::{guard, partition::partition};
use std::time::Instant;

/// End-to-end annotation of an explicit document batch: lifecycle guard,
/// run-scoped scratch dir, partition, dispatch (full barrier), aggregate.
/// The scratch dir is reclaimed on every exit path when it drops.
pub async fn annotate_documents(
    state: &AppState,
    docs: Vec<Document>,
) -> Result<Vec<ConceptMatch>> {
    guard::ensure_ready(&state.engine)
        .await
        .context("engine lifecycle check failed")?;

    let started = Instant::now();
    let scratch = tempfile::tempdir().context("failed to create scratch directory")?;
    let units = partition(&docs, scratch.path()).context("failed to partition documents")?;

    tracing::info!(
        units = units.len(),
        concurrency = state.concurrency,
        "dispatching engine jobs"
    );
    let reports = dispatch(&state.engine, &units, state.concurrency).await?;
    let failed = reports
        .iter()
        .filter(|r| matches!(r.outcome, JobOutcome::Failed(_)))
        .count();
    if failed > 0 {
        tracing::warn!(failed, total = reports.len(), "aggregating despite failed jobs");
    }

    let terms = aggregate(&units);
    tracing::info!(
        terms = terms.len(),
        elapsed = ?started.elapsed(),
        "annotation run finished"
    );
    Ok(terms)
}

/// Keyword entry point: consult the cache, otherwise fan out to the
/// literature sources, annotate whatever came back, and write the result
/// through the cache.
pub async fn annotate_keyword(
    state: &AppState,
    keyword: &str,
    use_cache: bool,
) -> Result<Vec<ConceptMatch>> {
    if use_cache {
        if let Some(hit) = state.cache.lock().get(keyword) {
            tracing::info!(%keyword, "cache hit");
            return Ok(hit.clone());
        }
        tracing::info!(%keyword, "cache miss");
    }

    let fetch_started = Instant::now();
    let docs = cuimap_fetch::fetch_all(&state.http, &state.fetch, keyword).await;
    tracing::info!(
        %keyword,
        documents = docs.len(),
        elapsed = ?fetch_started.elapsed(),
        "literature fetch finished"
    );

    let terms = annotate_documents(state, docs).await?;
    state.cache.lock().put(keyword.to_string(), terms.clone());
    Ok(terms)
}
