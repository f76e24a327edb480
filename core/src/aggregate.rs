use crate::{ConceptMatch, WorkUnit};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fs;

lazy_static! {
    static ref CUI: Regex = Regex::new(r"C\d{7}").expect("valid regex");
    static ref CATEGORY: Regex = Regex::new(r"\[([^\]]+)\]").expect("valid regex");
    static ref PREFERRED: Regex = Regex::new(r"\(([^)]+)\)").expect("valid regex");
}

/// Classification of a single engine output line.
///
/// The engine's output is line oriented: progress banners must be skipped,
/// a data line carries a CUI plus a bracketed category (with the preferred
/// name in an optional parenthesized segment), and everything else is a
/// parse miss to be logged and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Banner,
    Data {
        cui: String,
        term: String,
        category: String,
    },
    Miss,
}

pub fn classify(line: &str) -> Line {
    if line.starts_with("Processing") || line.starts_with("Meta Mapping") {
        return Line::Banner;
    }
    let cui = match CUI.find(line) {
        Some(m) => m.as_str().to_string(),
        None => return Line::Miss,
    };
    let category = match CATEGORY.captures(line) {
        Some(caps) => caps[1].to_string(),
        None => return Line::Miss,
    };
    let term = match PREFERRED.captures(line) {
        Some(caps) => caps[1].to_string(),
        None => fallback_term(line, &category),
    };
    Line::Data { cui, term, category }
}

/// Without a parenthesized preferred name the display name is whatever sits
/// between the leading `index:` prefix and the `[category]` tag.
fn fallback_term(line: &str, category: &str) -> String {
    let rest = line.splitn(3, ':').nth(1).unwrap_or(line);
    rest.replace(&format!("[{category}]"), "").trim().to_string()
}

/// Scan every work unit's output file and fold the data lines into
/// deduplicated, counted concept records.
///
/// A missing output file means that unit's job produced nothing (or failed)
/// and contributes zero lines. The result is sorted by descending count;
/// equal counts keep the order in which the concepts were first seen.
pub fn aggregate(units: &[WorkUnit]) -> Vec<ConceptMatch> {
    let mut order: Vec<String> = Vec::new();
    let mut by_cui: HashMap<String, ConceptMatch> = HashMap::new();

    for unit in units {
        let text = match fs::read_to_string(&unit.output) {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!(path = %unit.output.display(), %err, "no output for work unit");
                continue;
            }
        };
        for line in text.lines() {
            match classify(line) {
                Line::Banner => {}
                Line::Miss => {
                    if !line.trim().is_empty() {
                        tracing::warn!(%line, "cannot find cui/category for line");
                    }
                }
                Line::Data { cui, term, category } => {
                    if !by_cui.contains_key(&cui) {
                        order.push(cui.clone());
                        by_cui.insert(
                            cui.clone(),
                            ConceptMatch {
                                cui: cui.clone(),
                                term,
                                category,
                                count: 0,
                                sources: Default::default(),
                            },
                        );
                    }
                    if let Some(found) = by_cui.get_mut(&cui) {
                        found.count += 1;
                        found
                            .sources
                            .entry(unit.source.clone())
                            .or_default()
                            .insert(unit.doc_id.clone());
                    }
                }
            }
        }
    }

    let mut result: Vec<ConceptMatch> = order
        .into_iter()
        .filter_map(|cui| by_cui.remove(&cui))
        .collect();
    // Stable sort: ties keep discovery order.
    result.sort_by(|a, b| b.count.cmp(&a.count));
    result
}
