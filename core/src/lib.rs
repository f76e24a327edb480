use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

pub mod aggregate;
pub mod cache;

/// A source document queued for annotation. Produced by the literature
/// fetchers or supplied directly by the caller; `source` names the origin
/// system and `id` is unique within that source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub source: String,
    pub id: String,
    pub text: String,
}

/// One document prepared as an isolated input/output file pair for a single
/// engine invocation. The files live in a run-scoped scratch directory and
/// are reclaimed when that directory is dropped.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    pub input: PathBuf,
    pub output: PathBuf,
    pub source: String,
    pub doc_id: String,
}

/// An aggregated concept annotation. Identity is the CUI (`C` + 7 digits);
/// `count` sums occurrences across all work units of one run and `sources`
/// maps each origin system to the set of document ids that contributed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptMatch {
    pub cui: String,
    pub term: String,
    pub category: String,
    pub count: u32,
    pub sources: BTreeMap<String, BTreeSet<String>>,
}
