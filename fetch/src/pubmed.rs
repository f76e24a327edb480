use crate::{FetchConfig, FetchError};
use cuimap_core::Document;
use reqwest::Client;
use roxmltree::Document as Xml;

const BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// History handles returned by ESearch and consumed by EFetch.
#[derive(Debug, PartialEq, Eq)]
pub struct SearchHandles {
    pub count: u32,
    pub query_key: String,
    pub web_env: String,
}

/// Two-phase PubMed query through the E-utilities: ESearch for a result
/// count plus history handles, then EFetch bounded to `ret_max` articles.
/// A zero-match search skips the fetch phase entirely.
pub async fn get_pubmed(
    client: &Client,
    cfg: &FetchConfig,
    term: &str,
) -> Result<Vec<Document>, FetchError> {
    let key = match &cfg.pubmed_key {
        Some(key) => key,
        None => return Ok(Vec::new()),
    };
    let handles = search(client, cfg, key, term).await?;
    if handles.count == 0 {
        tracing::debug!(%term, "pubmed: no results");
        return Ok(Vec::new());
    }
    fetch(client, cfg, key, &handles).await
}

async fn search(
    client: &Client,
    cfg: &FetchConfig,
    key: &str,
    term: &str,
) -> Result<SearchHandles, FetchError> {
    let retmax = cfg.ret_max.to_string();
    let res = client
        .get(format!("{BASE_URL}/esearch.fcgi"))
        .query(&[
            ("db", "pubmed"),
            ("term", term),
            ("usehistory", "y"),
            ("retmax", retmax.as_str()),
            ("api_key", key),
        ])
        .timeout(cfg.pubmed_timeout)
        .send()
        .await?;
    if !res.status().is_success() {
        return Err(FetchError::Status(res.status().as_u16()));
    }
    parse_search(&res.text().await?)
}

async fn fetch(
    client: &Client,
    cfg: &FetchConfig,
    key: &str,
    handles: &SearchHandles,
) -> Result<Vec<Document>, FetchError> {
    let retmax = cfg.ret_max.to_string();
    let res = client
        .get(format!("{BASE_URL}/efetch.fcgi"))
        .query(&[
            ("db", "pubmed"),
            ("WebEnv", handles.web_env.as_str()),
            ("query_key", handles.query_key.as_str()),
            ("retmode", "xml"),
            ("retmax", retmax.as_str()),
            ("api_key", key),
        ])
        .timeout(cfg.pubmed_timeout)
        .send()
        .await?;
    if !res.status().is_success() {
        return Err(FetchError::Status(res.status().as_u16()));
    }
    parse_fetch(&res.text().await?)
}

pub fn parse_search(xml: &str) -> Result<SearchHandles, FetchError> {
    let doc = Xml::parse(xml).map_err(|err| FetchError::Malformed(err.to_string()))?;
    let root = doc.root_element();
    if root.tag_name().name() != "eSearchResult" {
        return Err(FetchError::Malformed("expected eSearchResult".into()));
    }
    let field = |name: &str| {
        root.children()
            .find(|n| n.has_tag_name(name))
            .and_then(|n| n.text())
            .map(str::to_string)
            .ok_or_else(|| FetchError::Malformed(format!("missing {name}")))
    };
    let count: u32 = field("Count")?
        .parse()
        .map_err(|_| FetchError::Malformed("Count is not a number".into()))?;
    if count == 0 {
        return Ok(SearchHandles {
            count: 0,
            query_key: String::new(),
            web_env: String::new(),
        });
    }
    Ok(SearchHandles {
        count,
        query_key: field("QueryKey")?,
        web_env: field("WebEnv")?,
    })
}

pub fn parse_fetch(xml: &str) -> Result<Vec<Document>, FetchError> {
    let doc = Xml::parse(xml).map_err(|err| FetchError::Malformed(err.to_string()))?;
    let root = doc.root_element();
    if root.tag_name().name() != "PubmedArticleSet" {
        return Err(FetchError::Malformed("expected PubmedArticleSet".into()));
    }

    let mut out = Vec::new();
    for citation in root
        .descendants()
        .filter(|n| n.has_tag_name("MedlineCitation"))
    {
        let pmid = match citation
            .children()
            .find(|n| n.has_tag_name("PMID"))
            .and_then(|n| n.text())
        {
            Some(pmid) => pmid.to_string(),
            None => {
                tracing::warn!("pubmed article without a PMID, skipping");
                continue;
            }
        };
        let article = match citation.children().find(|n| n.has_tag_name("Article")) {
            Some(article) => article,
            None => {
                tracing::warn!(%pmid, "pubmed citation without an Article section, skipping");
                continue;
            }
        };
        let title = article
            .children()
            .find(|n| n.has_tag_name("ArticleTitle"))
            .map(nested_text)
            .unwrap_or_default();
        // Abstracts come as one or more paragraphs, concatenated in
        // document order.
        let paragraphs: Vec<String> = article
            .descendants()
            .filter(|n| n.has_tag_name("AbstractText"))
            .map(nested_text)
            .filter(|p| !p.is_empty())
            .collect();
        let abstract_text = paragraphs.join(" ");

        if title.is_empty() && abstract_text.is_empty() {
            tracing::warn!(%pmid, "pubmed article with no title or abstract, skipping");
            continue;
        }
        out.push(Document {
            source: "pubmed".into(),
            id: pmid,
            text: format!("{title} {abstract_text}").trim().to_string(),
        });
    }
    tracing::debug!(articles = out.len(), "pubmed fetch parsed");
    Ok(out)
}

/// Collect all text under a node; abstract paragraphs and titles may carry
/// nested markup.
fn nested_text(node: roxmltree::Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}
