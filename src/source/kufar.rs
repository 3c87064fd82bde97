//! Kufar search API client
//!
//! ## API Reference
//!
//! Endpoint: `{base}/search-api/v2/search/rendered-paginated`
//! Returns: `{ "ads": [ ... ] }`, one page of listings sorted per `sort`
//!
//! Prices come back as decimal strings in the smallest currency unit.

use super::{FetchError, ListingSource};
use crate::backoff::ExponentialBackoff;
use crate::config::{KufarSettings, PriceRange, QuerySpec};
use crate::model::{Listing, ListingId};
use crate::shutdown::Shutdown;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

const SEARCH_PATH: &str = "/search-api/v2/search/rendered-paginated";

/// Search response structure
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub ads: Vec<RawAd>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAd {
    pub ad_id: u64,
    pub subject: String,
    #[serde(default)]
    pub price_byn: Option<String>,
    #[serde(default)]
    pub price_usd: Option<String>,
    pub ad_link: String,
    #[serde(default)]
    pub list_time: Option<String>,
}

pub struct KufarClient {
    http: reqwest::Client,
    base_url: String,
    max_retries: u32,
    shutdown: Shutdown,
}

impl KufarClient {
    pub fn new(settings: &KufarSettings, shutdown: Shutdown) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .redirect(reqwest::redirect::Policy::none())
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            max_retries: settings.max_retries,
            shutdown,
        })
    }

    async fn fetch_once(&self, spec: &QuerySpec) -> Result<Vec<Listing>, FetchError> {
        let url = format!("{}{}", self.base_url, SEARCH_PATH);
        let params = search_params(spec);

        log::debug!("🌐 GET {} ({} params) for [{}]", url, params.len(), spec.label());

        let response = self.http.get(&url).query(&params).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        log::debug!("HTTP response size={}", body.len());

        let parsed: SearchResponse = serde_json::from_slice(&body)?;
        Ok(into_listings(parsed, spec))
    }
}

#[async_trait]
impl ListingSource for KufarClient {
    async fn fetch(&self, spec: &QuerySpec) -> Result<Vec<Listing>, FetchError> {
        let mut backoff = ExponentialBackoff::new(1_000, 8_000, self.max_retries);

        loop {
            match self.fetch_once(spec).await {
                Ok(listings) => return Ok(listings),
                Err(e) if e.is_transient() => {
                    log::warn!("⚠️  Fetch for [{}] failed: {}", spec.label(), e);
                    if backoff.sleep(&self.shutdown).await.is_err() {
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn source_name(&self) -> &'static str {
        "Kufar"
    }
}

/// Map a query to search parameters. Absent filters produce no parameter.
pub fn search_params(spec: &QuerySpec) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();

    if let Some(tag) = &spec.tag {
        params.push(("query", tag.clone()));
    }
    if spec.only_title_search == Some(true) {
        params.push(("ot", "1".to_string()));
    }
    if let Some(range) = spec.price.and_then(price_range_param) {
        params.push(("prc", range));
    }
    if let Some(language) = &spec.language {
        params.push(("lang", language.clone()));
    }
    if let Some(limit) = spec.limit {
        params.push(("size", limit.to_string()));
    }
    if let Some(currency) = &spec.currency {
        params.push(("cur", currency.clone()));
    }
    if let Some(condition) = spec.condition {
        params.push(("cnd", condition.code().to_string()));
    }
    if let Some(seller) = spec.seller_type {
        params.push(("cmp", seller.code().to_string()));
    }

    let flags = [
        ("dle", spec.kufar_delivery_required),
        ("sde", spec.kufar_payment_required),
        ("hlv", spec.kufar_halva_required),
        ("oph", spec.only_with_photos),
        ("ovi", spec.only_with_videos),
        ("pse", spec.only_with_exchange_available),
    ];
    for (name, flag) in flags {
        if flag == Some(true) {
            params.push((name, "1".to_string()));
        }
    }

    if let Some(sort) = spec.sort_type {
        params.push(("sort", sort.code().to_string()));
    }
    if let Some(category) = spec.category {
        params.push(("prn", category.code().to_string()));
    }
    if let Some(sub_category) = spec.sub_category {
        params.push(("cat", sub_category.to_string()));
    }
    if let Some(region) = spec.region {
        params.push(("rgn", region.code().to_string()));
    }
    if let Some(areas) = spec.areas.as_ref().filter(|a| !a.is_empty()) {
        let joined: Vec<String> = areas.iter().map(|a| a.to_string()).collect();
        params.push(("ar", format!("v.or:{}", joined.join(","))));
    }

    params
}

fn price_range_param(range: PriceRange) -> Option<String> {
    match (range.min, range.max) {
        (None, None) => None,
        (Some(min), None) => Some(format!("r:{},", min)),
        (None, Some(max)) => Some(format!("r:0,{}", max)),
        (Some(min), Some(max)) => Some(format!("r:{},{}", min, max)),
    }
}

fn into_listings(response: SearchResponse, spec: &QuerySpec) -> Vec<Listing> {
    let use_usd = spec
        .currency
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case("USD"));

    response
        .ads
        .into_iter()
        .filter_map(|ad| {
            let raw_price = if use_usd { &ad.price_usd } else { &ad.price_byn };
            let price = match raw_price.as_deref().map(|p| p.trim().parse::<i64>()) {
                Some(Ok(price)) => price,
                // Negotiable or free listings carry no numeric price
                None => 0,
                Some(Err(_)) => {
                    log::warn!("⚠️  Skipping ad {}: unparseable price {:?}", ad.ad_id, raw_price);
                    return None;
                }
            };

            Some(Listing {
                id: ListingId(ad.ad_id),
                title: ad.subject,
                price,
                tag: spec.tag.clone(),
                link: ad.ad_link,
                published_at: ad.list_time.as_deref().and_then(parse_list_time),
            })
        })
        .collect()
}

/// Parse a Zulu timestamp such as `2024-03-01T12:30:00Z`
pub fn parse_list_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
