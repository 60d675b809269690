//! Earth Engine band metadata provider.
//!
//! Band names come from the authenticated REST API (`listImages` on the
//! collection, first image only). Descriptions, units and visualization
//! bounds come from the public Earth Engine STAC catalog; if that lookup
//! fails the bands are returned without metadata.

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use era5_auth::{Credentials, CredentialsError, TokenSource};
use era5_core::{AuthError, NetworkError, ProviderConfig, ReqwestErrorExt};

use crate::error::CatalogError;
use crate::months::month_starts;
use crate::retry::{with_retry, RetryConfig};

/// One band as reported by the provider, with whatever metadata it supplied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderBand {
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub visual_min: Option<f64>,
    pub visual_max: Option<f64>,
}

impl ProviderBand {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Time span covered by the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalExtent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TemporalExtent {
    /// First day of every month in the extent, oldest first.
    pub fn months(&self) -> Vec<chrono::NaiveDate> {
        month_starts(self.start.date_naive(), self.end.date_naive())
    }
}

/// Source of band definitions for the catalog builder.
pub trait BandProvider {
    /// Every band of the collection, in provider order.
    fn list_bands(&self) -> impl Future<Output = Result<Vec<ProviderBand>, CatalogError>> + Send;

    fn temporal_extent(&self) -> impl Future<Output = Result<TemporalExtent, CatalogError>> + Send;
}

pub struct EarthEngineProvider {
    client: reqwest::Client,
    api_base_url: String,
    stac_base_url: String,
    project: String,
    collection: String,
    credentials: Option<TokenSource>,
    retry: RetryConfig,
}

impl EarthEngineProvider {
    /// Build a provider; `credentials` may be absent, in which case band
    /// listing fails with `ProviderUnavailable` without touching the network.
    pub fn new(config: &ProviderConfig, credentials: Option<TokenSource>) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CatalogError::from(e.into_network_error()))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            stac_base_url: config.stac_base_url.trim_end_matches('/').to_string(),
            project: config.project.clone(),
            collection: config.collection.clone(),
            credentials,
            retry: RetryConfig::with_retries(config.max_retries),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn list_images_url(&self) -> String {
        format!(
            "{}/projects/{}/assets/{}:listImages",
            self.api_base_url, self.project, self.collection
        )
    }

    /// STAC entries live at `<root>/<collection with '/' as '_'>.json`.
    fn stac_url(&self) -> String {
        let root = self.collection.split('/').next().unwrap_or_default();
        format!(
            "{}/{}/{}.json",
            self.stac_base_url,
            root,
            self.collection.replace('/', "_")
        )
    }

    async fn credentials(&self) -> Result<Credentials, CatalogError> {
        let source = self.credentials.as_ref().ok_or(AuthError::NotConfigured)?;
        source.credentials().await.map_err(|e| match e {
            CredentialsError::Expired => AuthError::TokenExpired.into(),
            other => CatalogError::provider(other.to_string()),
        })
    }

    #[instrument(skip(self), fields(collection = %self.collection), level = "info")]
    async fn fetch_band_names(&self) -> Result<Vec<String>, CatalogError> {
        let credentials = self.credentials().await?;
        let url = self.list_images_url();

        let response = with_retry(&self.retry, || {
            let mut request = self
                .client
                .get(&url)
                .query(&[("pageSize", "1")])
                .header("Authorization", credentials.bearer());
            if let Some(project) = &credentials.project {
                request = request.header("x-goog-user-project", project);
            }
            request.send()
        })
        .await
        .map_err(|e| CatalogError::from(e.into_network_error()))?;

        let listing: ListImagesResponse = handle_response(response).await?;

        let image = listing
            .images
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::provider(format!("{} has no images", self.collection)))?;

        if image.bands.is_empty() {
            return Err(CatalogError::provider(format!(
                "{} reports no bands",
                self.collection
            )));
        }

        debug!(count = image.bands.len(), "Listed collection bands");
        Ok(image.bands.into_iter().map(|b| b.id).collect())
    }

    #[instrument(skip(self), fields(collection = %self.collection), level = "info")]
    async fn fetch_stac(&self) -> Result<StacCollection, CatalogError> {
        let url = self.stac_url();
        let response = with_retry(&self.retry, || self.client.get(&url).send())
            .await
            .map_err(|e| CatalogError::from(e.into_network_error()))?;

        handle_response(response).await
    }
}

impl BandProvider for EarthEngineProvider {
    async fn list_bands(&self) -> Result<Vec<ProviderBand>, CatalogError> {
        let names = self.fetch_band_names().await?;

        let metadata = match self.fetch_stac().await {
            Ok(stac) => stac.band_metadata(),
            Err(e) => {
                warn!("Band descriptions unavailable, using presets only: {}", e);
                HashMap::new()
            }
        };

        Ok(names
            .into_iter()
            .map(|name| match metadata.get(&name) {
                Some(meta) => ProviderBand {
                    name,
                    ..meta.clone()
                },
                None => ProviderBand::named(name),
            })
            .collect())
    }

    async fn temporal_extent(&self) -> Result<TemporalExtent, CatalogError> {
        let stac = self.fetch_stac().await?;
        stac.temporal_extent(Utc::now())
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, CatalogError> {
    let status = response.status();

    if status.is_success() {
        response.json().await.map_err(|e| {
            CatalogError::from(NetworkError::InvalidResponse(format!("JSON parse error: {}", e)))
        })
    } else if status.as_u16() == 401 || status.as_u16() == 403 {
        Err(AuthError::Rejected(status.as_u16()).into())
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(NetworkError::ServerError {
            status: status.as_u16(),
            message: text,
        }
        .into())
    }
}

#[derive(Debug, Deserialize)]
struct ListImagesResponse {
    #[serde(default)]
    images: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    #[serde(default)]
    bands: Vec<BandInfo>,
}

#[derive(Debug, Deserialize)]
struct BandInfo {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct StacCollection {
    #[serde(default)]
    summaries: StacSummaries,
    #[serde(default)]
    extent: Option<StacExtent>,
}

#[derive(Debug, Default, Deserialize)]
struct StacSummaries {
    #[serde(rename = "eo:bands", default)]
    bands: Vec<StacBand>,
    #[serde(rename = "gee:visualizations", default)]
    visualizations: Vec<StacVisualization>,
}

#[derive(Debug, Deserialize)]
struct StacBand {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "gee:units", default)]
    units: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StacVisualization {
    #[serde(default)]
    image_visualization: Option<ImageVisualization>,
}

#[derive(Debug, Deserialize)]
struct ImageVisualization {
    #[serde(default)]
    band_vis: Option<BandVis>,
}

#[derive(Debug, Deserialize)]
struct BandVis {
    #[serde(default)]
    bands: Vec<String>,
    #[serde(default)]
    min: Vec<f64>,
    #[serde(default)]
    max: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct StacExtent {
    temporal: StacTemporal,
}

#[derive(Debug, Deserialize)]
struct StacTemporal {
    interval: Vec<Vec<Option<String>>>,
}

impl StacCollection {
    fn band_metadata(&self) -> HashMap<String, ProviderBand> {
        let mut metadata: HashMap<String, ProviderBand> = HashMap::new();

        for band in &self.summaries.bands {
            metadata.insert(
                band.name.clone(),
                ProviderBand {
                    name: band.name.clone(),
                    description: band.description.as_deref().map(squash_whitespace),
                    unit: band.units.clone(),
                    visual_min: None,
                    visual_max: None,
                },
            );
        }

        // Only single-band visualizations say something about one band; first wins.
        for vis in &self.summaries.visualizations {
            let Some(band_vis) = vis
                .image_visualization
                .as_ref()
                .and_then(|iv| iv.band_vis.as_ref())
            else {
                continue;
            };
            let [band] = band_vis.bands.as_slice() else {
                continue;
            };
            let entry = metadata
                .entry(band.clone())
                .or_insert_with(|| ProviderBand::named(band.clone()));
            if entry.visual_min.is_none() && entry.visual_max.is_none() {
                entry.visual_min = band_vis.min.first().copied();
                entry.visual_max = band_vis.max.first().copied();
            }
        }

        metadata
    }

    /// First interval of the STAC extent; an open end means "until now".
    fn temporal_extent(&self, now: DateTime<Utc>) -> Result<TemporalExtent, CatalogError> {
        let interval = self
            .extent
            .as_ref()
            .and_then(|e| e.temporal.interval.first())
            .ok_or_else(|| CatalogError::provider("catalog entry has no temporal extent"))?;

        let start = interval
            .first()
            .and_then(|s| s.as_deref())
            .ok_or_else(|| CatalogError::provider("temporal extent has no start"))
            .and_then(parse_timestamp)?;

        let end = match interval.get(1).and_then(|s| s.as_deref()) {
            Some(end) => parse_timestamp(end)?,
            None => now,
        };

        if end < start {
            return Err(CatalogError::provider("temporal extent ends before it starts"));
        }

        Ok(TemporalExtent { start, end })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, CatalogError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CatalogError::provider(format!("bad timestamp {}: {}", value, e)))
}

fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LIST_PATH: &str =
        "/v1/projects/earthengine-public/assets/ECMWF/ERA5_LAND/MONTHLY_AGGR:listImages";
    const STAC_PATH: &str = "/stac/ECMWF/ECMWF_ERA5_LAND_MONTHLY_AGGR.json";

    fn config(server: &MockServer) -> ProviderConfig {
        ProviderConfig {
            api_base_url: format!("{}/v1", server.uri()),
            stac_base_url: format!("{}/stac/", server.uri()),
            timeout_secs: 2,
            request_timeout_secs: 2,
            max_retries: 0,
            ..ProviderConfig::default()
        }
    }

    fn provider(server: &MockServer) -> EarthEngineProvider {
        EarthEngineProvider::new(&config(server), Some(Credentials::new("test_token").into())).unwrap()
    }

    fn listing() -> serde_json::Value {
        serde_json::json!({
            "images": [{
                "id": "ECMWF/ERA5_LAND/MONTHLY_AGGR/195001",
                "bands": [
                    {"id": "temperature_2m", "dataType": {"precision": "DOUBLE"}},
                    {"id": "total_precipitation_sum"},
                    {"id": "mystery_band"}
                ]
            }]
        })
    }

    fn stac() -> serde_json::Value {
        serde_json::json!({
            "id": "ECMWF/ERA5_LAND/MONTHLY_AGGR",
            "extent": {"temporal": {"interval": [["1950-01-01T00:00:00Z", "2024-06-01T00:00:00Z"]]}},
            "summaries": {
                "eo:bands": [
                    {"name": "temperature_2m", "description": "Temperature of air\n  at 2m above the surface.", "gee:units": "K"},
                    {"name": "total_precipitation_sum", "description": "Accumulated precipitation.", "gee:units": "m"}
                ],
                "gee:visualizations": [
                    {"display_name": "Temperature", "image_visualization": {"band_vis": {"bands": ["temperature_2m"], "min": [250.0], "max": [320.0], "palette": ["000080", "ff0000"]}}},
                    {"display_name": "RGB", "image_visualization": {"band_vis": {"bands": ["a", "b", "c"], "min": [0], "max": [1]}}}
                ]
            }
        })
    }

    async fn mount_listing(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(LIST_PATH))
            .and(query_param("pageSize", "1"))
            .and(header("Authorization", "Bearer test_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
            .mount(server)
            .await;
    }

    #[test]
    fn test_stac_url_layout() {
        let config = ProviderConfig::default();
        let provider = EarthEngineProvider::new(&config, None).unwrap();
        assert_eq!(
            provider.stac_url(),
            "https://storage.googleapis.com/earthengine-stac/catalog/ECMWF/ECMWF_ERA5_LAND_MONTHLY_AGGR.json"
        );
        assert_eq!(
            provider.list_images_url(),
            "https://earthengine.googleapis.com/v1/projects/earthengine-public/assets/ECMWF/ERA5_LAND/MONTHLY_AGGR:listImages"
        );
    }

    #[tokio::test]
    async fn test_list_bands_merges_stac_metadata() {
        let mock_server = MockServer::start().await;
        mount_listing(&mock_server).await;
        Mock::given(method("GET"))
            .and(path(STAC_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(stac()))
            .mount(&mock_server)
            .await;

        let bands = provider(&mock_server).list_bands().await.unwrap();

        assert_eq!(bands.len(), 3);
        assert_eq!(bands[0].name, "temperature_2m");
        assert_eq!(bands[0].unit.as_deref(), Some("K"));
        assert_eq!(
            bands[0].description.as_deref(),
            Some("Temperature of air at 2m above the surface.")
        );
        assert_eq!(bands[0].visual_min, Some(250.0));
        assert_eq!(bands[0].visual_max, Some(320.0));
        assert_eq!(bands[1].visual_min, None);
        assert_eq!(bands[2], ProviderBand::named("mystery_band"));
    }

    #[tokio::test]
    async fn test_stac_failure_still_lists_bands() {
        let mock_server = MockServer::start().await;
        mount_listing(&mock_server).await;
        Mock::given(method("GET"))
            .and(path(STAC_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let bands = provider(&mock_server).list_bands().await.unwrap();

        assert_eq!(bands.len(), 3);
        assert!(bands.iter().all(|b| b.description.is_none()));
    }

    #[tokio::test]
    async fn test_billing_project_header() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LIST_PATH))
            .and(header("x-goog-user-project", "uni-dashboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
            .mount(&mock_server)
            .await;

        let mut credentials = Credentials::new("test_token");
        credentials.project = Some("uni-dashboard".into());
        let provider = EarthEngineProvider::new(&config(&mock_server), Some(credentials.into())).unwrap();

        let names = provider.fetch_band_names().await.unwrap();
        assert_eq!(names.len(), 3);
    }

    #[tokio::test]
    async fn test_unauthorized_is_provider_unavailable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LIST_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server).list_bands().await;
        assert!(matches!(result, Err(CatalogError::ProviderUnavailable(ref m)) if m.contains("401")));
    }

    #[tokio::test]
    async fn test_missing_credentials_skip_network() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
            .expect(0)
            .mount(&mock_server)
            .await;

        let provider = EarthEngineProvider::new(&config(&mock_server), None).unwrap();
        assert!(matches!(
            provider.list_bands().await,
            Err(CatalogError::ProviderUnavailable(_))
        ));

        let mut expired = Credentials::new("old");
        expired.expires_at = Some(0);
        let provider = EarthEngineProvider::new(&config(&mock_server), Some(expired.into())).unwrap();
        assert!(provider.list_bands().await.is_err());
    }

    #[tokio::test]
    async fn test_empty_collection_is_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LIST_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"images": []})))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server).list_bands().await;
        assert!(matches!(result, Err(CatalogError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LIST_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(listing())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&mock_server)
            .await;

        let mut config = config(&mock_server);
        config.request_timeout_secs = 1;
        let provider =
            EarthEngineProvider::new(&config, Some(Credentials::new("test_token").into())).unwrap();

        let result = provider.list_bands().await;
        assert!(matches!(result, Err(CatalogError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_temporal_extent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(STAC_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(stac()))
            .mount(&mock_server)
            .await;

        let extent = provider(&mock_server).temporal_extent().await.unwrap();
        let months = extent.months();

        assert_eq!(months.first().unwrap().to_string(), "1950-01-01");
        assert_eq!(months.last().unwrap().to_string(), "2024-06-01");
        assert_eq!(months.len(), 74 * 12 + 6);
    }

    #[test]
    fn test_open_ended_extent_runs_until_now() {
        let stac: StacCollection = serde_json::from_value(serde_json::json!({
            "extent": {"temporal": {"interval": [["2020-03-01T00:00:00Z", null]]}}
        }))
        .unwrap();
        let now = DateTime::parse_from_rfc3339("2020-05-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let extent = stac.temporal_extent(now).unwrap();
        assert_eq!(extent.end, now);
        assert_eq!(extent.months().len(), 3);
    }

    #[test]
    fn test_missing_extent_is_an_error() {
        let stac = StacCollection::default();
        assert!(stac.temporal_extent(Utc::now()).is_err());
    }
}
