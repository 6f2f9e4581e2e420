//! Remote detector reached with one blocking POST per image

use super::{DetectError, RegionDetector, normalize_detections};
use crate::config::DetectorConfig;
use crate::models::{DetectionCandidate, RasterImage};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Detector service client
///
/// Sends the image as PNG, optionally with a bearer token, and never retries.
#[derive(Debug, Clone)]
pub struct HttpRegionDetector {
    client: Client,
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpRegionDetector {
    /// Client for `endpoint` with a per-request timeout
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DetectError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DetectError::ServiceUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token,
            timeout,
        })
    }

    /// Client from environment-derived settings
    pub fn from_config(config: &DetectorConfig) -> Result<Self, DetectError> {
        Self::new(config.endpoint.clone(), config.token.clone(), config.timeout)
    }

    /// Endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Recognize a model-loading answer
///
/// Covers `{"error": "... loading ...", "estimated_time": 20.0}` bodies.
pub fn busy_from_body(body: &Value) -> Option<DetectError> {
    let obj = body.as_object()?;
    let loading = obj
        .get("error")
        .and_then(Value::as_str)
        .is_some_and(|e| e.to_ascii_lowercase().contains("loading"));
    let estimated = obj.get("estimated_time").and_then(Value::as_f64);
    if !loading && estimated.is_none() {
        return None;
    }
    Some(DetectError::ServiceBusy {
        estimated_wait: estimated
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(Duration::from_secs_f64),
    })
}

impl RegionDetector for HttpRegionDetector {
    fn detect(&self, image: &RasterImage) -> Result<Vec<DetectionCandidate>, DetectError> {
        let png = image
            .encode_png()
            .map_err(|e| DetectError::ServiceUnavailable(e.to_string()))?;

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(png);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                DetectError::Timeout(self.timeout)
            } else {
                DetectError::ServiceUnavailable(e.to_string())
            }
        })?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|e| DetectError::ServiceUnavailable(e.to_string()))?;
        let body: Option<Value> = serde_json::from_str(&text).ok();

        if let Some(busy) = body.as_ref().and_then(busy_from_body) {
            debug!(%status, "detector warming up");
            return Err(busy);
        }
        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(DetectError::ServiceBusy {
                estimated_wait: None,
            });
        }
        if !status.is_success() {
            return Err(DetectError::ServiceUnavailable(format!("HTTP {status}")));
        }
        let body = body.ok_or_else(|| {
            DetectError::ServiceUnavailable("response is not JSON".to_string())
        })?;
        Ok(normalize_detections(&body, image.width(), image.height()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_busy_bodies() {
        let busy = busy_from_body(&json!({"error": "Model barcode-det is currently loading", "estimated_time": 12.5}));
        assert_eq!(
            busy,
            Some(DetectError::ServiceBusy {
                estimated_wait: Some(Duration::from_millis(12_500))
            })
        );
        assert_eq!(
            busy_from_body(&json!({"error": "Loading"})),
            Some(DetectError::ServiceBusy {
                estimated_wait: None
            })
        );
        assert_eq!(busy_from_body(&json!({"error": "unauthorized"})), None);
        assert_eq!(busy_from_body(&json!([{"bbox": [0, 0, 5, 5]}])), None);
    }

    #[test]
    fn test_unreachable_endpoint_is_unavailable() {
        // port 9 on localhost: nothing listens, the connect fails fast
        let detector =
            HttpRegionDetector::new("http://127.0.0.1:9/detect", None, Duration::from_secs(2))
                .unwrap();
        let img = RasterImage::filled(8, 8, 3, 128).unwrap();
        match detector.detect(&img) {
            Err(DetectError::ServiceUnavailable(_)) | Err(DetectError::Timeout(_)) => {}
            other => panic!("unexpected {other:?}"),
        }
    }
}
