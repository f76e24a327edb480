use crate::{FetchConfig, FetchError};
use cuimap_core::Document;
use reqwest::Client;
use serde_json::Value;

const OMIM_URL: &str = "https://api.omim.org/api/entry/search";

/// Single-phase OMIM lookup keyed by exact dbSNP identifier. Returns the
/// allelic variant matching the requested rsid, or nothing.
pub async fn get_omim(
    client: &Client,
    cfg: &FetchConfig,
    rsid: &str,
) -> Result<Option<Document>, FetchError> {
    let key = match &cfg.omim_key {
        Some(key) => key,
        None => return Ok(None),
    };
    let search = format!("av_db_snp:{rsid}");
    let res = client
        .get(OMIM_URL)
        .query(&[
            ("search", search.as_str()),
            ("include", "allelicVariantList"),
            ("format", "json"),
        ])
        .header("apiKey", key)
        .timeout(cfg.omim_timeout)
        .send()
        .await?;
    if !res.status().is_success() {
        return Err(FetchError::Status(res.status().as_u16()));
    }
    let body: Value = res.json().await?;
    Ok(select_variant(&body, rsid))
}

/// Walk the entry list for the variant whose `dbSnps` equals the requested
/// rsid. The document id is `{mimNumber}#{number}` with the variant number
/// zero-padded to four digits.
pub fn select_variant(body: &Value, rsid: &str) -> Option<Document> {
    let variants = body
        .get("omim")?
        .get("searchResponse")?
        .get("entryList")?
        .get(0)?
        .get("entry")?
        .get("allelicVariantList")?
        .as_array()?;
    for each in variants {
        let Some(variant) = each.get("allelicVariant") else {
            continue;
        };
        if variant.get("dbSnps").and_then(Value::as_str) != Some(rsid) {
            continue;
        }
        let text = variant.get("text").and_then(Value::as_str)?.to_string();
        let mim = variant.get("mimNumber").and_then(Value::as_u64)?;
        let number = variant.get("number").and_then(Value::as_u64)?;
        return Some(Document {
            source: "omim".into(),
            id: format!("{mim}#{number:04}"),
            text,
        });
    }
    None
}
