use crate::{EngineConfig, EngineError};
use cuimap_core::WorkUnit;
use std::io::ErrorKind;
use tokio::process::Command;
use tokio::task::JoinSet;

/// Completion signal for one dispatched work unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// The engine ran but the invocation failed; siblings are unaffected.
    Failed(String),
    /// The engine command itself does not exist. Escalated to a fatal
    /// [`EngineError::NotInstalled`] once the barrier completes.
    MissingCommand,
}

#[derive(Debug)]
pub struct JobReport {
    /// Index of the work unit in the dispatched slice.
    pub unit: usize,
    pub outcome: JobOutcome,
}

/// Run one engine invocation per work unit with at most `concurrency`
/// child processes in flight.
///
/// This is a full barrier: it returns only after every submitted job has
/// completed or failed, so aggregation never reads an output file that is
/// still being written. Each job yields a [`JobReport`]; a failing unit is
/// logged and reported without aborting its siblings.
pub async fn dispatch(
    cfg: &EngineConfig,
    units: &[WorkUnit],
    concurrency: usize,
) -> Result<Vec<JobReport>, EngineError> {
    let concurrency = concurrency.max(1);
    let mut queue = units.iter().enumerate();
    let mut inflight = JoinSet::new();
    let mut reports = Vec::with_capacity(units.len());

    loop {
        // Keep the pool full.
        while inflight.len() < concurrency {
            match queue.next() {
                Some((idx, unit)) => {
                    let cmd = build_command(cfg, unit);
                    inflight.spawn(run_one(idx, cmd));
                }
                None => break,
            }
        }
        match inflight.join_next().await {
            Some(Ok(report)) => {
                match &report.outcome {
                    JobOutcome::Completed => {
                        tracing::debug!(unit = report.unit, "engine job finished")
                    }
                    JobOutcome::Failed(reason) => {
                        tracing::error!(unit = report.unit, %reason, "engine job failed")
                    }
                    JobOutcome::MissingCommand => {
                        tracing::error!(unit = report.unit, "engine command not found")
                    }
                }
                reports.push(report);
            }
            Some(Err(err)) => tracing::error!(%err, "engine worker panicked"),
            None => break,
        }
    }

    if reports
        .iter()
        .any(|r| r.outcome == JobOutcome::MissingCommand)
    {
        return Err(EngineError::NotInstalled);
    }
    reports.sort_by_key(|r| r.unit);
    Ok(reports)
}

/// Fixed option set (CUI output, conjunctive matching), plus the configured
/// semantic-type / data-source restrictions.
fn build_command(cfg: &EngineConfig, unit: &WorkUnit) -> Command {
    let mut cmd = Command::new(&cfg.metamap_bin);
    cmd.args(["-I", "-p", "-K", "-8", "--silent", "--conj"]);
    if !cfg.sem_types.is_empty() {
        cmd.arg("-J").arg(cfg.sem_types.join(","));
    }
    if !cfg.data_sources.is_empty() {
        cmd.arg("-R").arg(cfg.data_sources.join(","));
    }
    cmd.arg(&unit.input).arg(&unit.output);
    cmd
}

async fn run_one(unit: usize, mut cmd: Command) -> JobReport {
    let outcome = match cmd.output().await {
        Ok(out) if out.status.success() => JobOutcome::Completed,
        Ok(out) => JobOutcome::Failed(format!(
            "engine exited with {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )),
        Err(err) if err.kind() == ErrorKind::NotFound => JobOutcome::MissingCommand,
        Err(err) => JobOutcome::Failed(err.to_string()),
    };
    JobReport { unit, outcome }
}
