use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{HttpMethod, OverpassConfig};
use crate::errors::{Result, SkywayError};
use crate::metrics::registry::{
    OVERPASS_ERRORS_TOTAL, OVERPASS_REQUESTS_TOTAL, OVERPASS_REQUEST_DURATION_SECONDS,
};
use crate::models::element::{CsvTable, OverpassJson, OverpassResponse};
use crate::overpass::rate_limiter::RateLimiter;
use crate::query::settings::PayloadFormat;
use crate::utils::hash::query_fingerprint;

/// Blocking Overpass API client. Every call is a single attempt.
#[derive(Clone)]
pub struct OverpassClient {
    url: String,
    method: HttpMethod,
    rate_limiter: RateLimiter,
    http_client: reqwest::blocking::Client,
}

impl OverpassClient {
    pub fn new(config: &OverpassConfig) -> Result<Self> {
        let http_client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.http_timeout)
            .build()?;

        info!(
            url = %config.url,
            method = ?config.method,
            rate_limit = config.rate_limit_per_second,
            "Initialized Overpass client"
        );

        Ok(Self {
            url: config.url.clone(),
            method: config.method,
            rate_limiter: RateLimiter::new(config.rate_limit_per_second),
            http_client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a query and decode the body according to `format`
    pub fn send(&self, query: &str, format: &PayloadFormat) -> Result<OverpassResponse> {
        if !format.is_decodable() {
            OVERPASS_ERRORS_TOTAL
                .with_label_values(&["unsupported_format"])
                .inc();
            return Err(SkywayError::unsupported_format(format.name()));
        }

        let body = self.send_raw(query)?;
        decode_body(&body, format).inspect_err(|_| {
            OVERPASS_ERRORS_TOTAL.with_label_values(&["decode"]).inc();
        })
    }

    /// Send a query and return the body text untouched
    pub fn send_raw(&self, query: &str) -> Result<String> {
        let fingerprint = query_fingerprint(query);
        let method = match self.method {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        };
        debug!(%fingerprint, method, "Sending Overpass query: {}", query);

        OVERPASS_REQUESTS_TOTAL.with_label_values(&[method]).inc();
        self.rate_limiter.acquire();

        let encoded = urlencoding::encode(query);
        let request = match self.method {
            HttpMethod::Get => self
                .http_client
                .get(format!("{}?data={}", self.url, encoded)),
            HttpMethod::Post => self
                .http_client
                .post(&self.url)
                .header(
                    reqwest::header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                )
                .body(format!("data={}", encoded)),
        };

        let started = Instant::now();
        let response = request.send().inspect_err(|e| {
            warn!(%fingerprint, "Overpass request failed: {}", e);
            OVERPASS_ERRORS_TOTAL.with_label_values(&["transport"]).inc();
        })?;
        OVERPASS_REQUEST_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());

        let status = response.status();
        if !status.is_success() {
            OVERPASS_ERRORS_TOTAL.with_label_values(&["http"]).inc();
            let body = response.text().unwrap_or_default();
            warn!(%fingerprint, status = status.as_u16(), "Overpass API error");
            return Err(SkywayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text()?;
        info!(
            %fingerprint,
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Overpass query completed"
        );
        Ok(body)
    }
}

fn decode_body(body: &str, format: &PayloadFormat) -> Result<OverpassResponse> {
    match format {
        PayloadFormat::Json => {
            let json = OverpassJson::from_body(body)?;
            if let Some(remark) = &json.remark {
                warn!("Overpass remark: {}", remark);
            }
            Ok(OverpassResponse::Json(json))
        }
        PayloadFormat::Csv(csv) => Ok(OverpassResponse::Csv(CsvTable::parse(
            body,
            &csv.separator,
            csv.header,
        )?)),
        other => Err(SkywayError::unsupported_format(other.name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::settings::CsvFormat;

    #[test]
    fn test_client_initialization() {
        let client = OverpassClient::new(&OverpassConfig::default()).unwrap();
        assert_eq!(client.url(), crate::config::DEFAULT_OVERPASS_URL);
        assert_eq!(client.rate_limiter.requests_per_second(), 1);
    }

    #[test]
    fn test_unsupported_format_fails_before_sending() {
        let config = OverpassConfig {
            // Nothing listens here; reaching the network would be a transport error
            url: "http://127.0.0.1:9/api/interpreter".to_string(),
            rate_limit_per_second: 0,
            ..OverpassConfig::default()
        };
        let client = OverpassClient::new(&config).unwrap();

        for format in [PayloadFormat::Xml, PayloadFormat::Custom, PayloadFormat::Popup] {
            let err = client.send("node(1);out;", &format).unwrap_err();
            assert!(matches!(err, SkywayError::UnsupportedFormat(_)));
        }
    }

    #[test]
    fn test_decode_json_body() {
        let response =
            decode_body(r#"{"elements": [{"type": "node", "id": 7}]}"#, &PayloadFormat::Json)
                .unwrap();
        assert_eq!(response.as_json().unwrap().elements[0].id, 7);
    }

    #[test]
    fn test_decode_csv_body() {
        let format = PayloadFormat::Csv(CsvFormat::with_columns(["::id", "name"]));
        let response = decode_body("@id\tname\n1\tFoo\n", &format).unwrap();
        let table = response.as_csv().unwrap();
        assert_eq!(table.rows, vec![vec!["1", "Foo"]]);
    }

    #[test]
    fn test_decode_mismatched_body() {
        let err = decode_body("<osm></osm>", &PayloadFormat::Json).unwrap_err();
        assert!(matches!(err, SkywayError::Decode(_)));
    }
}
