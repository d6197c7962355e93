//! Remote transport: image downloads and catalog API queries
//!
//! Both capabilities sit behind traits so resolvers can be exercised with
//! injected fakes. The HTTP implementations carry an explicit per-request
//! deadline; a hung remote call may stall its own batch window but never
//! the whole process.

use crate::errors::TransportError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("exercise-images/", env!("CARGO_PKG_VERSION"));

/// Downloads raw image bytes from a remote URL
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

/// Read-only client for the exercise catalog API
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn search_exercises(&self, term: &str) -> Result<Vec<CatalogExercise>, TransportError>;

    async fn exercise_images(
        &self,
        exercise_base: i64,
        main_only: bool,
    ) -> Result<Vec<CatalogImage>, TransportError>;
}

/// One page of catalog results
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
pub struct CatalogPage<T> {
    #[serde(default)]
    pub results: Vec<T>,
}

/// Search result entry; `exercise_base` keys the image lookup
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogExercise {
    pub exercise_base: i64,
    #[serde(default)]
    pub name: Option<String>,
}

/// Image descriptor attached to a catalog exercise
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogImage {
    pub image: String,
    #[serde(default)]
    pub is_main: bool,
}

/// reqwest-backed image downloader
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::status(response.status().as_u16(), url));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// reqwest-backed catalog client for the wger-style REST API
pub struct HttpCatalogClient {
    client: Client,
    base_url: Url,
    language: u16,
    page_limit: u16,
}

impl HttpCatalogClient {
    pub fn new(
        base_url: &str,
        language: u16,
        page_limit: u16,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join treats "v2" and "v2/" differently; anchor on the latter
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self {
            client,
            base_url,
            language,
            page_limit,
        })
    }

    fn search_url(&self, term: &str) -> Result<Url, TransportError> {
        let mut url = self.base_url.join("exercise/")?;
        url.query_pairs_mut()
            .append_pair("language", &self.language.to_string())
            .append_pair("limit", &self.page_limit.to_string())
            .append_pair("search", term);
        Ok(url)
    }

    fn images_url(&self, exercise_base: i64, main_only: bool) -> Result<Url, TransportError> {
        let mut url = self.base_url.join("exerciseimage/")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("exercise_base", &exercise_base.to_string());
            if main_only {
                pairs.append_pair("is_main", "True");
            }
        }
        Ok(url)
    }

    async fn get_page<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<Vec<T>, TransportError> {
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::status(
                response.status().as_u16(),
                url.to_string(),
            ));
        }
        let page: CatalogPage<T> = response.json().await?;
        Ok(page.results)
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
    async fn search_exercises(&self, term: &str) -> Result<Vec<CatalogExercise>, TransportError> {
        self.get_page(self.search_url(term)?).await
    }

    async fn exercise_images(
        &self,
        exercise_base: i64,
        main_only: bool,
    ) -> Result<Vec<CatalogImage>, TransportError> {
        self.get_page(self.images_url(exercise_base, main_only)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpCatalogClient {
        HttpCatalogClient::new("https://wger.de/api/v2", 2, 20, Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn search_url_matches_catalog_contract() {
        let url = client().search_url("bench press").unwrap();
        assert_eq!(
            url.as_str(),
            "https://wger.de/api/v2/exercise/?language=2&limit=20&search=bench+press"
        );
    }

    #[test]
    fn images_url_filters_primary_only_when_asked() {
        let c = client();
        assert_eq!(
            c.images_url(1234, true).unwrap().as_str(),
            "https://wger.de/api/v2/exerciseimage/?exercise_base=1234&is_main=True"
        );
        assert_eq!(
            c.images_url(1234, false).unwrap().as_str(),
            "https://wger.de/api/v2/exerciseimage/?exercise_base=1234"
        );
    }

    #[test]
    fn base_url_without_trailing_slash_is_anchored() {
        let c = HttpCatalogClient::new("https://wger.de/api/v2/", 2, 20, Duration::from_secs(10))
            .unwrap();
        assert_eq!(
            c.search_url("squat").unwrap().as_str(),
            "https://wger.de/api/v2/exercise/?language=2&limit=20&search=squat"
        );
    }

    #[test]
    fn catalog_page_tolerates_missing_results() {
        let page: CatalogPage<CatalogImage> = serde_json::from_str("{}").unwrap();
        assert!(page.results.is_empty());

        let page: CatalogPage<CatalogImage> = serde_json::from_str(
            r#"{"count": 1, "results": [{"image": "https://wger.de/media/1.png", "is_main": true}]}"#,
        )
        .unwrap();
        assert_eq!(page.results.len(), 1);
        assert!(page.results[0].is_main);
    }
}
