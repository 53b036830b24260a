//! MAST archive client: light-curve search and download.

use crate::adapters::fits;
use crate::core::{ArchiveClient, ConfigProvider, DatasetHandle, Mission, TargetId, TimeSeries};
use crate::utils::error::{Result, VizError};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://mast.stsci.edu";

const INVOKE_PATH: &str = "api/v0/invoke";
const DOWNLOAD_PATH: &str = "api/v0.1/Download/file";
const SEARCH_RADIUS_DEG: f64 = 0.0001;
const PAGE_SIZE: u32 = 50_000;

/// How a target identifier is looked up in the archive.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetQuery {
    /// Catalog number of a mission's input catalog, matched on `target_name`.
    Catalog { mission: Mission, target_name: String },
    /// Anything else is resolved to coordinates first.
    Name(String),
}

impl TargetQuery {
    pub fn parse(target: &TargetId) -> Self {
        static CATALOG_ID: OnceLock<Regex> = OnceLock::new();
        let re = CATALOG_ID.get_or_init(|| {
            Regex::new(r"^(?i)(TIC|KIC|EPIC)?[\s_-]*(\d+)$").expect("catalog id pattern")
        });

        let Some(caps) = re.captures(target.as_str()) else {
            return TargetQuery::Name(target.as_str().to_string());
        };
        let Ok(number) = caps[2].parse::<u64>() else {
            return TargetQuery::Name(target.as_str().to_string());
        };

        let mission = match caps.get(1).map(|m| m.as_str().to_ascii_uppercase()) {
            Some(prefix) if prefix == "KIC" => Mission::Kepler,
            Some(prefix) if prefix == "EPIC" => Mission::K2,
            Some(_) => Mission::Tess,
            // 純數字依編號範圍判斷所屬目錄
            None if number > 0 && number < 13_161_030 => Mission::Kepler,
            None if number > 200_000_000 && number < 251_813_739 => Mission::K2,
            None => Mission::Tess,
        };

        let target_name = match mission {
            Mission::Tess => number.to_string(),
            Mission::Kepler => format!("kplr{:09}", number),
            Mission::K2 => format!("ktwo{}", number),
        };

        TargetQuery::Catalog {
            mission,
            target_name,
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Observation {
    #[serde(deserialize_with = "string_or_number")]
    obsid: String,
    obs_collection: String,
    obs_id: String,
    #[serde(default)]
    sequence_number: Option<i64>,
    #[serde(default)]
    provenance_name: Option<String>,
    #[serde(default)]
    t_exptime: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct Product {
    #[serde(deserialize_with = "string_or_number")]
    parent_obsid: String,
    #[serde(rename = "productFilename")]
    product_filename: String,
    #[serde(rename = "dataURI")]
    data_uri: String,
}

impl Product {
    fn is_light_curve(&self) -> bool {
        self.product_filename.to_ascii_lowercase().ends_with("lc.fits")
    }
}

pub struct MastClient {
    client: Client,
    base_url: Url,
    missions: Vec<Mission>,
}

impl MastClient {
    pub fn new(endpoint: &str, timeout: Duration, missions: Vec<Mission>) -> Result<Self> {
        let mut base_url = Url::parse(endpoint).map_err(|e| VizError::InvalidConfigValueError {
            field: "archive.endpoint".to_string(),
            value: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("transit-finder/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            missions,
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C, missions: Vec<Mission>) -> Result<Self> {
        Self::new(
            config.archive_endpoint(),
            Duration::from_secs(config.request_timeout_secs()),
            missions,
        )
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| VizError::ConfigError {
                message: format!("Cannot build archive URL for {}: {}", path, e),
            })
    }

    async fn invoke(&self, service: &str, params: Value) -> Result<Value> {
        let request = json!({
            "service": service,
            "format": "json",
            "params": params,
            "pagesize": PAGE_SIZE,
            "page": 1,
            "removenullcolumns": true,
        });

        tracing::debug!("MAST request: {}", service);
        let response = self
            .client
            .post(self.endpoint(INVOKE_PATH)?)
            .form(&[("request", serde_json::to_string(&request)?)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VizError::ArchiveError {
                message: format!("{} returned HTTP {}", service, status),
            });
        }

        let body: Value = response.json().await?;
        if body.get("status").and_then(Value::as_str) == Some("ERROR") {
            let msg = body
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(VizError::ArchiveError {
                message: format!("{} failed: {}", service, msg),
            });
        }
        Ok(body)
    }

    async fn invoke_rows<T: for<'de> Deserialize<'de>>(
        &self,
        service: &str,
        params: Value,
    ) -> Result<Vec<T>> {
        let mut body = self.invoke(service, params).await?;
        let data = body.get_mut("data").map(Value::take).unwrap_or(Value::Null);
        match data {
            Value::Null => Ok(Vec::new()),
            rows => Ok(serde_json::from_value(rows)?),
        }
    }

    async fn resolve_name(&self, name: &str) -> Result<Option<(f64, f64)>> {
        let body = self
            .invoke("Mast.Name.Lookup", json!({ "input": name, "format": "json" }))
            .await?;

        let coordinate = body
            .get("resolvedCoordinate")
            .and_then(Value::as_array)
            .and_then(|list| list.first());
        Ok(coordinate.and_then(|c| {
            Some((
                c.get("ra")?.as_f64()?,
                c.get("decl")?.as_f64()?,
            ))
        }))
    }

    fn base_filters(&self, missions: &[Mission]) -> Vec<Value> {
        let collections: Vec<&str> = missions.iter().map(Mission::collection).collect();
        vec![
            json!({ "paramName": "obs_collection", "values": collections }),
            json!({ "paramName": "dataproduct_type", "values": ["timeseries"] }),
        ]
    }

    async fn observations(&self, query: &TargetQuery) -> Result<Vec<Observation>> {
        match query {
            TargetQuery::Catalog {
                mission,
                target_name,
            } => {
                if !self.missions.contains(mission) {
                    tracing::warn!(
                        "{} catalog identifiers are disabled by the mission filter",
                        mission
                    );
                    return Ok(Vec::new());
                }
                let mut filters = self.base_filters(std::slice::from_ref(mission));
                filters.push(json!({ "paramName": "target_name", "values": [target_name] }));
                self.invoke_rows(
                    "Mast.Caom.Filtered",
                    json!({ "columns": "*", "filters": filters }),
                )
                .await
            }
            TargetQuery::Name(name) => {
                let Some((ra, dec)) = self.resolve_name(name).await? else {
                    tracing::warn!("Could not resolve '{}' to coordinates", name);
                    return Ok(Vec::new());
                };
                tracing::debug!("Resolved {} to RA {:.5}, Dec {:.5}", name, ra, dec);
                self.invoke_rows(
                    "Mast.Caom.Filtered.Position",
                    json!({
                        "columns": "*",
                        "filters": self.base_filters(&self.missions),
                        "position": format!("{}, {}, {}", ra, dec, SEARCH_RADIUS_DEG),
                    }),
                )
                .await
            }
        }
    }

    async fn products(&self, observations: &[Observation]) -> Result<Vec<Product>> {
        let obsids: Vec<&str> = observations.iter().map(|o| o.obsid.as_str()).collect();
        self.invoke_rows("Mast.Caom.Products", json!({ "obsid": obsids.join(",") }))
            .await
    }
}

#[async_trait]
impl ArchiveClient for MastClient {
    async fn search(&self, target: &TargetId) -> Result<Vec<DatasetHandle>> {
        let query = TargetQuery::parse(target);
        tracing::debug!("Target {} parsed as {:?}", target, query);

        let observations = self.observations(&query).await?;
        if observations.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_parent: HashMap<String, Vec<Product>> = HashMap::new();
        for product in self.products(&observations).await? {
            if product.is_light_curve() {
                by_parent
                    .entry(product.parent_obsid.clone())
                    .or_default()
                    .push(product);
            }
        }

        let mut handles = Vec::new();
        for obs in &observations {
            let Some(mission) = Mission::from_collection(&obs.obs_collection) else {
                continue;
            };
            for product in by_parent.remove(&obs.obsid).unwrap_or_default() {
                handles.push(DatasetHandle {
                    mission,
                    obs_id: obs.obs_id.clone(),
                    sequence: obs.sequence_number,
                    author: obs
                        .provenance_name
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string()),
                    exposure_seconds: obs.t_exptime,
                    product_filename: product.product_filename,
                    data_uri: product.data_uri,
                });
            }
        }

        Ok(handles)
    }

    async fn download(&self, handle: &DatasetHandle) -> Result<TimeSeries> {
        let mut url = self.endpoint(DOWNLOAD_PATH)?;
        url.query_pairs_mut().append_pair("uri", &handle.data_uri);

        tracing::debug!("Downloading {}", handle.product_filename);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(VizError::ArchiveError {
                message: format!(
                    "Download of {} failed with HTTP {}",
                    handle.product_filename, status
                ),
            });
        }

        let bytes = response.bytes().await?;
        fits::read_light_curve_bytes(&bytes, handle.mission.default_quality_bitmask())
    }
}
