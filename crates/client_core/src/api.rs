use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Word, WordId, WordPatch},
    error::{ApiException, ErrorCode},
    protocol::{
        AddCategoryRequest, AddWordsRequest, AddWordsResponse, SuccessResponse, WireWordPatch,
        WordsResponse,
    },
};
use tracing::debug;
use url::Url;

use crate::config::ClientSettings;

/// REST boundary of the dictionary backend.
#[async_trait]
pub trait DictionaryApi: Send + Sync {
    async fn fetch_categories(&self) -> Result<Vec<String>>;
    async fn fetch_words(&self) -> Result<Vec<Word>>;
    async fn fetch_words_by_category(&self, category: &str) -> Result<Vec<Word>>;
    async fn add_category(&self, name: &str) -> Result<bool>;
    /// `raw_text` is passed through untouched; the backend decides how to split it.
    async fn add_words(&self, raw_text: &str, category: &str) -> Result<Vec<Word>>;
    async fn update_word(&self, id: &WordId, patch: &WordPatch) -> Result<bool>;
    async fn delete_word(&self, id: &WordId) -> Result<bool>;
}

pub struct MissingDictionaryApi;

#[async_trait]
impl DictionaryApi for MissingDictionaryApi {
    async fn fetch_categories(&self) -> Result<Vec<String>> {
        Err(anyhow!("dictionary backend is unavailable"))
    }

    async fn fetch_words(&self) -> Result<Vec<Word>> {
        Err(anyhow!("dictionary backend is unavailable"))
    }

    async fn fetch_words_by_category(&self, category: &str) -> Result<Vec<Word>> {
        Err(anyhow!(
            "dictionary backend is unavailable for category {category}"
        ))
    }

    async fn add_category(&self, _name: &str) -> Result<bool> {
        Err(anyhow!("dictionary backend is unavailable"))
    }

    async fn add_words(&self, _raw_text: &str, _category: &str) -> Result<Vec<Word>> {
        Err(anyhow!("dictionary backend is unavailable"))
    }

    async fn update_word(&self, id: &WordId, _patch: &WordPatch) -> Result<bool> {
        Err(anyhow!("dictionary backend is unavailable for word {id}"))
    }

    async fn delete_word(&self, id: &WordId) -> Result<bool> {
        Err(anyhow!("dictionary backend is unavailable for word {id}"))
    }
}

/// [`DictionaryApi`] over HTTP/JSON.
#[derive(Clone)]
pub struct HttpDictionaryClient {
    http: Client,
    base_url: Url,
}

impl HttpDictionaryClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: settings.api_url()?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("api url {} cannot be a base", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn words_response(&self) -> Result<WordsResponse> {
        let url = self.endpoint(&["get_words"])?;
        debug!(%url, "fetching dictionary words");
        let res = self
            .http
            .get(url)
            .send()
            .await
            .context("failed to reach dictionary backend")?;
        decode(res).await
    }
}

async fn decode<T: DeserializeOwned>(res: Response) -> Result<T> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            format!("backend responded with {status}")
        } else {
            format!("backend responded with {status}: {}", body.trim())
        };
        return Err(ApiException::new(ErrorCode::from_status(status.as_u16()), message).into());
    }

    let bytes = res
        .bytes()
        .await
        .context("failed to read dictionary backend response")?;
    serde_json::from_slice(&bytes).map_err(|err| {
        ApiException::new(
            ErrorCode::Malformed,
            format!("unexpected response body: {err}"),
        )
        .into()
    })
}

fn acknowledged(ack: SuccessResponse) -> bool {
    if !ack.success {
        if let Some(error) = &ack.error {
            debug!(%error, "backend rejected request");
        }
    }
    ack.success
}

#[async_trait]
impl DictionaryApi for HttpDictionaryClient {
    async fn fetch_categories(&self) -> Result<Vec<String>> {
        Ok(self.words_response().await?.categories)
    }

    async fn fetch_words(&self) -> Result<Vec<Word>> {
        let body = self.words_response().await?;
        Ok(body.words.into_iter().map(Word::from).collect())
    }

    async fn fetch_words_by_category(&self, category: &str) -> Result<Vec<Word>> {
        let words = self.fetch_words().await?;
        Ok(words
            .into_iter()
            .filter(|word| word.category == category)
            .collect())
    }

    async fn add_category(&self, name: &str) -> Result<bool> {
        let res = self
            .http
            .post(self.endpoint(&["add_category"])?)
            .json(&AddCategoryRequest {
                category: name.to_string(),
            })
            .send()
            .await
            .context("failed to reach dictionary backend")?;
        Ok(acknowledged(decode(res).await?))
    }

    async fn add_words(&self, raw_text: &str, category: &str) -> Result<Vec<Word>> {
        let res = self
            .http
            .post(self.endpoint(&["add_words"])?)
            .json(&AddWordsRequest {
                words: raw_text.to_string(),
                category: category.to_string(),
            })
            .send()
            .await
            .context("failed to reach dictionary backend")?;
        let body: AddWordsResponse = decode(res).await?;
        Ok(body.results.into_iter().map(Word::from).collect())
    }

    async fn update_word(&self, id: &WordId, patch: &WordPatch) -> Result<bool> {
        let wire = WireWordPatch::try_from(patch)?;
        let res = self
            .http
            .put(self.endpoint(&["update_word", id.as_str()])?)
            .json(&wire)
            .send()
            .await
            .context("failed to reach dictionary backend")?;
        Ok(acknowledged(decode(res).await?))
    }

    async fn delete_word(&self, id: &WordId) -> Result<bool> {
        let res = self
            .http
            .delete(self.endpoint(&["delete_word", id.as_str()])?)
            .send()
            .await
            .context("failed to reach dictionary backend")?;
        Ok(acknowledged(decode(res).await?))
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
