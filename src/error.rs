use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Everything that can go wrong between configuration and the finished CSV.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// API key or actor number could not be resolved at configuration time.
    #[error("{0}")]
    Credential(String),

    /// Connection failure, timeout, or exhausted transport retries.
    #[error("could not reach the registry: {0}")]
    Network(#[from] reqwest::Error),

    /// The registry rejected the API key or actor number.
    #[error("{0}")]
    Auth(String),

    /// A fault reported by the registry itself (result code plus message).
    #[error("registry fault ({code}): {message}")]
    Fault { code: String, message: String },

    /// Response body did not match the expected shape.
    #[error("failed to parse registry response from {url}: {message}")]
    Parse { url: String, message: String },

    /// The input CSV could not be used as a source of registry numbers.
    #[error("invalid input file {}: {message}", .path.display())]
    Input { path: PathBuf, message: String },

    /// Output file could not be created, written, or renamed.
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV-level read/write failure.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Detail fetching gave up after an unbroken run of failures.
    #[error("aborted after {0} consecutive failed detail fetches")]
    TooManyFailures(usize),
}

/// Fault payloads the registry sends alongside non-2xx statuses.
///
/// The JSON endpoints are not consistent about the envelope, so every field
/// is optional and the first present one wins.
#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct RegistryFaultReply {
    #[serde(default, rename = "Ergebniscode")]
    pub(crate) code: Option<String>,
    #[serde(default, rename = "Meldung")]
    pub(crate) meldung: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) detail: Option<String>,
}

impl RegistryFaultReply {
    fn text(&self) -> Option<&str> {
        self.meldung
            .as_deref()
            .or(self.message.as_deref())
            .or(self.detail.as_deref())
    }
}

pub(crate) fn classify_fault(status: StatusCode, url: &str, body: &str) -> RegistryError {
    let reply = serde_json::from_str::<RegistryFaultReply>(body).unwrap_or_default();
    let message = reply
        .text()
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string());

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return RegistryError::Auth(format!(
            "registry authentication failed (HTTP {}).\n- Check that the API key is valid and not expired (MaStR tokens must be renewed in the web portal)\n- Check that the MaStR number belongs to the same account as the key\n\nServer message: {}\nrequest: {}",
            status.as_u16(),
            if message.is_empty() { "(none)" } else { message.as_str() },
            url
        ));
    }

    RegistryError::Fault {
        code: reply
            .code
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_auth() {
        let err = classify_fault(
            StatusCode::UNAUTHORIZED,
            "https://example.test/GetEinheitSolar",
            r#"{"message":"invalid token"}"#,
        );
        match err {
            RegistryError::Auth(msg) => {
                assert!(msg.contains("invalid token"));
                assert!(msg.contains("GetEinheitSolar"));
            }
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[test]
    fn forbidden_maps_to_auth() {
        let err = classify_fault(StatusCode::FORBIDDEN, "https://example.test", "");
        assert!(matches!(err, RegistryError::Auth(_)));
    }

    #[test]
    fn registry_code_and_meldung_win() {
        let err = classify_fault(
            StatusCode::BAD_REQUEST,
            "https://example.test",
            r#"{"Ergebniscode":"EinheitNichtVorhanden","Meldung":"keine Einheit gefunden"}"#,
        );
        match err {
            RegistryError::Fault { code, message } => {
                assert_eq!(code, "EinheitNichtVorhanden");
                assert_eq!(message, "keine Einheit gefunden");
            }
            other => panic!("expected Fault, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_body_falls_back_to_http_status() {
        let err = classify_fault(
            StatusCode::INTERNAL_SERVER_ERROR,
            "https://example.test",
            "<html>oops</html>",
        );
        match err {
            RegistryError::Fault { code, message } => {
                assert_eq!(code, "HTTP 500");
                assert_eq!(message, "<html>oops</html>");
            }
            other => panic!("expected Fault, got {other:?}"),
        }
    }
}
