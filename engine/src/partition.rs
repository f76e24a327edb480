use crate::EngineError;
use cuimap_core::{Document, WorkUnit};
use std::fs;
use std::path::Path;

/// Suffix appended to a work unit's input path to form its output path.
const RESULT_SUFFIX: &str = ".res";

/// Split a document batch into one work unit per document, writing each
/// sanitized text to its own input file under `dir`. Provenance (source
/// system + document id) is carried on the unit so aggregation can attribute
/// concepts back to the documents that contributed them.
pub fn partition(docs: &[Document], dir: &Path) -> Result<Vec<WorkUnit>, EngineError> {
    let mut units = Vec::with_capacity(docs.len());
    for doc in docs {
        let input = dir.join(format!("input_{}_{}.tmp", doc.source, doc.id));
        let mut text = sanitize(&doc.text);
        // The engine requires a newline at EOF.
        text.push('\n');
        fs::write(&input, &text)?;

        let mut output = input.clone().into_os_string();
        output.push(RESULT_SUFFIX);
        units.push(WorkUnit {
            input,
            output: output.into(),
            source: doc.source.clone(),
            doc_id: doc.id.clone(),
        });
    }
    tracing::debug!(units = units.len(), dir = %dir.display(), "work units written");
    Ok(units)
}

/// The engine's input contract is 7-bit ASCII; everything else is dropped.
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn doc(source: &str, id: &str, text: &str) -> Document {
        Document {
            source: source.into(),
            id: id.into(),
            text: text.into(),
        }
    }

    #[test]
    fn strips_non_ascii_characters() {
        let sanitized = sanitize("myocardial\u{00e9} infarction \u{4e2d}\u{6587} \u{03b2}-blocker");
        assert!(sanitized.bytes().all(|b| b < 128));
        assert!(sanitized.contains("myocardial infarction"));
        assert!(sanitized.contains("-blocker"));
    }

    #[test]
    fn one_unit_per_document_with_provenance() {
        let dir = tempdir().unwrap();
        let docs = vec![
            doc("pubmed", "123", "first"),
            doc("omim", "600000#0001", "second"),
        ];
        let units = partition(&docs, dir.path()).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].source, "pubmed");
        assert_eq!(units[0].doc_id, "123");
        assert_eq!(units[1].source, "omim");
        assert_eq!(units[1].doc_id, "600000#0001");
    }

    #[test]
    fn input_file_is_ascii_with_trailing_newline() {
        let dir = tempdir().unwrap();
        let docs = vec![doc("pubmed", "9", "caf\u{00e9} au lait macules")];
        let units = partition(&docs, dir.path()).unwrap();
        let written = fs::read(&units[0].input).unwrap();
        assert!(written.iter().all(|&b| b < 128));
        assert_eq!(written.last(), Some(&b'\n'));
        assert_eq!(
            String::from_utf8(written).unwrap(),
            "caf au lait macules\n"
        );
    }

    #[test]
    fn output_path_appends_result_suffix() {
        let dir = tempdir().unwrap();
        let units = partition(&[doc("pubmed", "5", "x")], dir.path()).unwrap();
        let input = units[0].input.to_string_lossy().to_string();
        let output = units[0].output.to_string_lossy().to_string();
        assert_eq!(output, format!("{input}.res"));
    }
}
