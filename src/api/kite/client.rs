use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::api::{
    client::{BrokerClient, RawOrder, SessionGrant},
    error::ApiError,
    rate_limiter::RateLimiter,
};
use crate::models::BrokerProfile;

use super::{
    mapper::{map_order_to_raw_order, map_profile},
    types::{KiteOrder, KiteProfile, KiteResponse, KiteSession},
};

const LOGIN_URL: &str = "https://kite.zerodha.com/connect/login";
const BASE_URL: &str = "https://api.kite.trade";
const SESSION_ENDPOINT: &str = "/session/token";
const ORDERS_ENDPOINT: &str = "/orders";
const PROFILE_ENDPOINT: &str = "/user/profile";
const KITE_VERSION: &str = "3";

// Kite allows 10 req/s across the REST API
const KITE_REQUESTS_PER_SECOND: u32 = 10;
const RATE_LIMIT_PAUSE: Duration = Duration::from_secs(1);

pub struct KiteClient {
    api_key: String,
    api_secret: String,
    http_client: reqwest::Client,
    rate_limiter: RateLimiter,
}

impl KiteClient {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret,
            http_client: reqwest::Client::new(),
            rate_limiter: RateLimiter::per_second(KITE_REQUESTS_PER_SECOND),
        }
    }

    /// SHA-256 of api_key + request_token + api_secret, hex encoded
    fn checksum(&self, request_token: &str) -> String {
        let digest = Sha256::digest(format!("{}{}{}", self.api_key, request_token, self.api_secret));
        format!("{:x}", digest)
    }

    fn build_headers(&self, access_token: Option<&str>) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert("X-Kite-Version", HeaderValue::from_static(KITE_VERSION));

        if let Some(token) = access_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("token {}:{}", self.api_key, token))
                    .map_err(|e| ApiError::AuthenticationError(format!("Invalid access token: {}", e)))?,
            );
        }

        Ok(headers)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, access_token: &str) -> Result<T, ApiError> {
        self.rate_limiter.acquire().await;

        let response = self
            .http_client
            .get(format!("{}{}", BASE_URL, endpoint))
            .headers(self.build_headers(Some(access_token))?)
            .send()
            .await?;

        self.parse(response).await
    }

    /// A 429 pauses every later request from this client
    async fn parse<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T, ApiError> {
        parse_response(response).await.inspect_err(|e| {
            if matches!(e, ApiError::RateLimitError(_)) {
                log::warn!("Kite rate limit hit, pausing requests for {:?}", RATE_LIMIT_PAUSE);
                self.rate_limiter.back_off(RATE_LIMIT_PAUSE);
            }
        })
    }
}

/// Unwrap the Kite envelope, turning HTTP and API-level failures into `ApiError`
async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if status == 429 {
        return Err(ApiError::RateLimitError(
            "Rate limit exceeded. Please wait before retrying.".to_string(),
        ));
    }

    let body = response.text().await?;

    if status == 401 || status == 403 {
        return Err(ApiError::AuthenticationError(format!(
            "Kite rejected the session: {}",
            body
        )));
    }

    let envelope: KiteResponse<T> = serde_json::from_str(&body)
        .map_err(|e| ApiError::ParseError(format!("Failed to parse response: {} - Body: {}", e, body)))?;
    unwrap_envelope(envelope)
}

fn unwrap_envelope<T>(envelope: KiteResponse<T>) -> Result<T, ApiError> {
    if envelope.status != "success" {
        return Err(ApiError::BrokerError {
            code: envelope.error_type.unwrap_or_else(|| "UnknownException".to_string()),
            message: envelope.message.unwrap_or_default(),
        });
    }
    envelope
        .data
        .ok_or_else(|| ApiError::ParseError("Response has no data".to_string()))
}

#[async_trait]
impl BrokerClient for KiteClient {
    fn broker_name(&self) -> &str {
        "kite"
    }

    fn login_url(&self) -> String {
        format!("{}?v={}&api_key={}", LOGIN_URL, KITE_VERSION, self.api_key)
    }

    async fn generate_session(&self, request_token: &str) -> Result<SessionGrant, ApiError> {
        self.rate_limiter.acquire().await;

        let checksum = self.checksum(request_token);
        let form = [
            ("api_key", self.api_key.as_str()),
            ("request_token", request_token),
            ("checksum", checksum.as_str()),
        ];

        let response = self
            .http_client
            .post(format!("{}{}", BASE_URL, SESSION_ENDPOINT))
            .headers(self.build_headers(None)?)
            .form(&form)
            .send()
            .await?;

        let session: KiteSession = self.parse(response).await?;
        log::info!("Kite session established for {}", session.user_id);

        Ok(SessionGrant {
            access_token: session.access_token,
            user_id: Some(session.user_id),
        })
    }

    async fn fetch_orders(&self, access_token: &str) -> Result<Vec<RawOrder>, ApiError> {
        let orders: Vec<KiteOrder> = self.get(ORDERS_ENDPOINT, access_token).await?;

        let mut raw_orders = Vec::with_capacity(orders.len());
        for order in &orders {
            match map_order_to_raw_order(order) {
                Ok(raw) => raw_orders.push(raw),
                Err(e) => log::warn!("Skipping Kite order {}: {}", order.order_id, e),
            }
        }

        log::debug!("Fetched {} Kite orders", raw_orders.len());
        Ok(raw_orders)
    }

    async fn profile(&self, access_token: &str) -> Result<BrokerProfile, ApiError> {
        let profile: KiteProfile = self.get(PROFILE_ENDPOINT, access_token).await?;
        Ok(map_profile(profile))
    }
}
