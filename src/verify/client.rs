use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

const RATE_LIMIT_MARKER: &str = "Too many requests";

/// Transport-level failure of a verification call.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("verification call timed out: {0}")]
    Timeout(String),

    #[error("verification call failed: {0}")]
    Transport(String),

    #[error("invalid verification endpoint: {0}")]
    Endpoint(String),
}

impl From<reqwest::Error> for CheckError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CheckError::Timeout(e.to_string())
        } else {
            CheckError::Transport(e.to_string())
        }
    }
}

/// What the verification service said about one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResponse {
    Interested { reason: Option<String> },
    NotInterested { reason: Option<String> },
    RateLimited { message: String },
    ApiError { status: u16, detail: String },
}

pub trait VerificationService: Send + Sync {
    fn check_address(&self, address: &str) -> Result<CheckResponse, CheckError>;
}

#[derive(Deserialize)]
struct CheckBody {
    interested: Option<bool>,
    reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Maps a raw HTTP response onto a `CheckResponse`. Only an explicit
/// `interested: false` is a rejection; an undecodable 2xx body is an API error.
pub fn interpret_response(status: u16, body: &str) -> CheckResponse {
    if (200..300).contains(&status) {
        return match serde_json::from_str::<CheckBody>(body) {
            Ok(CheckBody {
                interested: Some(false),
                reason,
            }) => CheckResponse::NotInterested { reason },
            Ok(CheckBody { reason, .. }) => CheckResponse::Interested { reason },
            Err(e) => CheckResponse::ApiError {
                status,
                detail: format!("undecodable body: {e}"),
            },
        };
    }

    if status == 400 {
        if let Ok(ErrorBody {
            message: Some(message),
        }) = serde_json::from_str::<ErrorBody>(body)
        {
            if message.contains(RATE_LIMIT_MARKER) {
                return CheckResponse::RateLimited { message };
            }
        }
    }

    CheckResponse::ApiError {
        status,
        detail: body.chars().take(200).collect(),
    }
}

/// `GET {base}check-address?address=...` with a 10 s timeout.
pub struct AddressCheckClient {
    client: Client,
    endpoint: Url,
}

impl AddressCheckClient {
    pub fn new(base_url: &Url) -> Result<Self, CheckError> {
        let endpoint = base_url
            .join("check-address")
            .map_err(|e| CheckError::Endpoint(e.to_string()))?;
        let client = Client::builder()
            .timeout(VERIFY_TIMEOUT)
            .build()
            .map_err(|e| CheckError::Endpoint(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl VerificationService for AddressCheckClient {
    fn check_address(&self, address: &str) -> Result<CheckResponse, CheckError> {
        let resp = self
            .client
            .get(self.endpoint.clone())
            .query(&[("address", address)])
            .send()?;

        let status = resp.status().as_u16();
        let body = resp.text()?;
        Ok(interpret_response(status, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_false_is_not_interested() {
        assert_eq!(
            interpret_response(200, r#"{"interested": false, "reason": "outside buy box"}"#),
            CheckResponse::NotInterested {
                reason: Some("outside buy box".into())
            }
        );
    }

    #[test]
    fn missing_or_true_interest_verifies() {
        assert!(matches!(
            interpret_response(200, r#"{"interested": true}"#),
            CheckResponse::Interested { .. }
        ));
        assert!(matches!(
            interpret_response(200, r#"{"reason": "n/a"}"#),
            CheckResponse::Interested { .. }
        ));
    }

    #[test]
    fn rate_limit_is_recognised_from_the_message() {
        let r = interpret_response(400, r#"{"message": "Too many requests, slow down"}"#);
        assert!(matches!(r, CheckResponse::RateLimited { .. }));

        let other = interpret_response(400, r#"{"message": "bad address"}"#);
        assert!(matches!(other, CheckResponse::ApiError { status: 400, .. }));
    }

    #[test]
    fn other_statuses_and_bad_bodies_are_api_errors() {
        assert!(matches!(interpret_response(500, "oops"), CheckResponse::ApiError { status: 500, .. }));
        assert!(matches!(interpret_response(200, "<html>"), CheckResponse::ApiError { status: 200, .. }));
    }

    #[test]
    fn endpoint_joins_onto_base() {
        let base = Url::parse("http://api.sfr3.com/sfr3/offmarket/").unwrap();
        let client = AddressCheckClient::new(&base).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://api.sfr3.com/sfr3/offmarket/check-address");
    }
}
