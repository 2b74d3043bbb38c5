//! OpenAlex client: scholarly literature search for lecture bibliographies.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_AUTHORS: usize = 5;

pub const SORT_MOST_CITED: &str = "cited_by_count:desc";
pub const SORT_NEWEST: &str = "publication_date:desc";

#[derive(Debug, Error)]
pub enum OpenAlexError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAlex returned status {status}: {message}")]
    Api { status: u16, message: String },
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WorksPage {
    #[serde(default)]
    results: Vec<Work>,
}

/// The subset of an OpenAlex `work` the bibliography needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Work {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub authorships: Vec<Authorship>,
    #[serde(default)]
    pub primary_location: Option<Location>,
    #[serde(default)]
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Authorship {
    #[serde(default)]
    pub author: Option<Author>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub source: Option<Source>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub display_name: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Bibliography
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BibliographyEntry {
    pub title: String,
    /// First five authors.
    pub authors: Vec<String>,
    pub year: String,
    /// Bare DOI, without the resolver prefix. Empty when unknown.
    pub doi: String,
    pub openalex_id: String,
    /// Journal or venue.
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bibliography {
    pub core: Vec<BibliographyEntry>,
    pub recent: Vec<BibliographyEntry>,
}

impl Bibliography {
    pub fn is_empty(&self) -> bool {
        self.core.is_empty() && self.recent.is_empty()
    }
}

pub fn build_bibliography(works: &[Work]) -> Vec<BibliographyEntry> {
    works.iter().map(bibliography_entry).collect()
}

fn bibliography_entry(work: &Work) -> BibliographyEntry {
    let authors = work
        .authorships
        .iter()
        .take(MAX_AUTHORS)
        .map(|a| {
            a.author
                .as_ref()
                .and_then(|author| author.display_name.clone())
                .unwrap_or_else(|| "Unknown".to_string())
        })
        .collect();

    let year = work
        .publication_date
        .as_deref()
        .and_then(|date| date.split('-').next())
        .filter(|y| !y.is_empty())
        .unwrap_or("Unknown")
        .to_string();

    let doi = work
        .doi
        .as_deref()
        .map(|d| d.replace("https://doi.org/", ""))
        .unwrap_or_default();

    let openalex_id = work
        .id
        .as_deref()
        .map(|id| id.replace("https://openalex.org/", ""))
        .unwrap_or_default();

    let venue_name = |loc: &Location| loc.source.as_ref().and_then(|s| s.display_name.clone());
    let source = work
        .primary_location
        .as_ref()
        .filter(|loc| loc.source.is_some())
        .map(|loc| venue_name(loc).unwrap_or_else(|| "Unknown".to_string()))
        .or_else(|| work.locations.iter().find_map(venue_name))
        .unwrap_or_else(|| "Unknown".to_string());

    BibliographyEntry {
        title: work.title.clone().unwrap_or_else(|| "Untitled".to_string()),
        authors,
        year,
        doi,
        openalex_id,
        source,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct OpenAlexClient {
    client: Client,
    base_url: String,
    email: Option<String>,
}

impl OpenAlexClient {
    pub fn new(base_url: &str, email: Option<String>) -> Result<Self, OpenAlexError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            email,
        })
    }

    fn query_params(&self, query: &str, per_page: u32, sort: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("search", query.to_string()),
            ("per_page", per_page.to_string()),
            ("sort", sort.to_string()),
        ];
        if let Some(email) = &self.email {
            params.push(("mailto", email.clone()));
        }
        params
    }

    pub async fn search_works(
        &self,
        query: &str,
        per_page: u32,
        sort: &str,
    ) -> Result<Vec<Work>, OpenAlexError> {
        let url = format!("{}/works", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&self.query_params(query, per_page, sort))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OpenAlexError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let page: WorksPage = response.json().await?;
        debug!(query, sort, results = page.results.len(), "OpenAlex search");
        Ok(page.results)
    }

    /// Most-cited and newest works for `query`.
    pub async fn top_core_and_recent(
        &self,
        query: &str,
        core_count: u32,
        recent_count: u32,
    ) -> Result<Bibliography, OpenAlexError> {
        self.core_and_recent(query, query, core_count, recent_count)
            .await
    }

    /// Most-cited works for `core_query` and newest works for `recent_query`.
    pub async fn core_and_recent(
        &self,
        core_query: &str,
        recent_query: &str,
        core_count: u32,
        recent_count: u32,
    ) -> Result<Bibliography, OpenAlexError> {
        let core = self
            .search_works(core_query, core_count, SORT_MOST_CITED)
            .await?;
        let recent = self
            .search_works(recent_query, recent_count, SORT_NEWEST)
            .await?;

        let bibliography = Bibliography {
            core: build_bibliography(&core),
            recent: build_bibliography(&recent),
        };
        info!(
            core_query,
            recent_query,
            core = bibliography.core.len(),
            recent = bibliography.recent.len(),
            "Bibliography collected"
        );
        Ok(bibliography)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work_from(json: serde_json::Value) -> Work {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_entry_extracts_fields() {
        let work = work_from(serde_json::json!({
            "id": "https://openalex.org/W2741809807",
            "title": "The state of OA",
            "doi": "https://doi.org/10.7717/peerj.4375",
            "publication_date": "2018-02-13",
            "authorships": [
                {"author": {"display_name": "Heather Piwowar"}},
                {"author": {"display_name": "Jason Priem"}}
            ],
            "primary_location": {"source": {"display_name": "PeerJ"}}
        }));
        let entry = bibliography_entry(&work);
        assert_eq!(entry.title, "The state of OA");
        assert_eq!(entry.authors, vec!["Heather Piwowar", "Jason Priem"]);
        assert_eq!(entry.year, "2018");
        assert_eq!(entry.doi, "10.7717/peerj.4375");
        assert_eq!(entry.openalex_id, "W2741809807");
        assert_eq!(entry.source, "PeerJ");
    }

    #[test]
    fn test_entry_defaults_for_missing_fields() {
        let entry = bibliography_entry(&work_from(serde_json::json!({})));
        assert_eq!(entry.title, "Untitled");
        assert!(entry.authors.is_empty());
        assert_eq!(entry.year, "Unknown");
        assert_eq!(entry.doi, "");
        assert_eq!(entry.source, "Unknown");
    }

    #[test]
    fn test_authors_limited_to_five() {
        let authorships: Vec<_> = (0..8)
            .map(|i| serde_json::json!({"author": {"display_name": format!("A{i}")}}))
            .collect();
        let entry = bibliography_entry(&work_from(serde_json::json!({ "authorships": authorships })));
        assert_eq!(entry.authors.len(), 5);
        assert_eq!(entry.authors[4], "A4");
    }

    #[test]
    fn test_venue_falls_back_to_locations() {
        let work = work_from(serde_json::json!({
            "primary_location": {"source": null},
            "locations": [
                {"source": null},
                {"source": {"display_name": "Slavic Review"}}
            ]
        }));
        assert_eq!(bibliography_entry(&work).source, "Slavic Review");
    }

    #[test]
    fn test_mailto_added_when_email_configured() {
        let client =
            OpenAlexClient::new("https://api.openalex.org/", Some("me@uni.edu".to_string()))
                .unwrap();
        let params = client.query_params("tolstoy", 10, SORT_MOST_CITED);
        assert!(params.contains(&("mailto", "me@uni.edu".to_string())));
        assert!(params.contains(&("sort", "cited_by_count:desc".to_string())));
        assert_eq!(client.base_url, "https://api.openalex.org");

        let anonymous = OpenAlexClient::new("https://api.openalex.org", None).unwrap();
        assert!(!anonymous
            .query_params("tolstoy", 10, SORT_NEWEST)
            .iter()
            .any(|(k, _)| *k == "mailto"));
    }
}
