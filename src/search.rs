use std::time::Duration;

use serde_json::Value;

use crate::cache::ChebiCache;
use crate::domain::ChebiId;
use crate::entity::ChebiEntity;
use crate::error::ChebiError;
use crate::store::{http_client, send_with_retries};

const OLS_SEARCH_URL: &str = "https://www.ebi.ac.uk/ols4/api/search";

/// Remote ontology search by term, returning matching compound ids.
pub trait SearchClient {
    fn search_ids(&self, term: &str, exact: bool) -> Result<Vec<ChebiId>, ChebiError>;
}

pub struct OlsHttpClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl OlsHttpClient {
    pub fn new() -> Result<Self, ChebiError> {
        Ok(Self {
            client: http_client(Duration::from_secs(30))?,
            base_url: OLS_SEARCH_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

impl SearchClient for OlsHttpClient {
    fn search_ids(&self, term: &str, exact: bool) -> Result<Vec<ChebiId>, ChebiError> {
        let response = send_with_retries(|| {
            self.client.get(&self.base_url).query(&[
                ("q", term),
                ("ontology", "chebi"),
                ("exact", if exact { "true" } else { "false" }),
                ("rows", "50"),
            ])
        })
        .map_err(|err| ChebiError::SearchHttp(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "search request failed".to_string());
            return Err(ChebiError::SearchStatus { status, message });
        }

        let body: Value = response
            .json()
            .map_err(|err| ChebiError::SearchHttp(err.to_string()))?;
        let docs = body
            .get("response")
            .and_then(|response| response.get("docs"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut ids = Vec::new();
        for doc in docs {
            if let Some(obo_id) = doc.get("obo_id").and_then(Value::as_str) {
                if let Ok(id) = obo_id.parse::<ChebiId>() {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
        }
        Ok(ids)
    }
}

/// Looks a term up in the remote search service and returns an entity for
/// every match present in the flat-file release. Hits the service knows but
/// the release does not are skipped with a warning.
pub fn search<'c>(
    cache: &'c ChebiCache,
    client: &dyn SearchClient,
    term: &str,
    exact: bool,
) -> Result<Vec<ChebiEntity<'c>>, ChebiError> {
    let mut entities = Vec::new();
    for id in client.search_ids(term, exact)? {
        match ChebiEntity::new(cache, id) {
            Ok(entity) => entities.push(entity),
            Err(ChebiError::UnknownId(_)) => {
                tracing::warn!(%id, "search match absent from the flat-file release");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(entities)
}
