use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Value, json};
use std::thread;
use std::time::Duration;
use tracing::debug;

use crate::config::load_config;
use crate::error::{RegistryError, Result, classify_fault};
use crate::records::{ListReply, UnitRecord};
use crate::util::{backoff, retriable_status, urljoin};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the registry's JSON endpoints.
    pub url: String,
    /// API key issued by the registry web portal.
    pub api_key: String,
    /// MaStR number of the market actor the key belongs to.
    pub mastr_number: String,
}

/// The narrow registry surface the export pipelines run against.
///
/// Tests substitute an in-memory implementation; production code uses
/// [`Client`].
pub trait UnitSource {
    /// Fetches one page of unit summaries, starting `offset` units into the
    /// data set.
    fn list_page(&self, offset: usize, limit: usize) -> Result<Vec<UnitRecord>>;

    /// Fetches the full detail record of one solar unit.
    fn unit_detail(&self, unit_number: &str) -> Result<UnitRecord>;
}

#[derive(Debug, Clone)]
pub struct Client {
    url: String,
    api_key: String,
    mastr_number: String,

    retry_max: usize,
    sleep_max: Duration,

    http: HttpClient,
}

impl Client {
    /// Creates a client using environment variables and/or `.mastrrc`.
    ///
    /// This is equivalent to `Client::new(None, None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::new(None, None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit `url`/`api_key`/`mastr_number` arguments
    /// - environment variables `MASTR_API_URL` / `API_KEY` / `MASTR_NUMBER`
    /// - config file from `MASTR_RC` or `.mastrrc`
    pub fn new(
        url: Option<String>,
        api_key: Option<String>,
        mastr_number: Option<String>,
    ) -> Result<Self> {
        let cfg = load_config(url, api_key, mastr_number)?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("mastr-solar/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("mastr-solar")),
        );

        let http = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            url: cfg.url,
            api_key: cfg.api_key,
            mastr_number: cfg.mastr_number,
            retry_max: 3,
            sleep_max: Duration::from_secs(30),
            http,
        })
    }

    pub fn with_retry_max(mut self, retry_max: usize) -> Self {
        self.retry_max = retry_max;
        self
    }

    pub fn with_sleep_max(mut self, sleep_max: Duration) -> Self {
        self.sleep_max = sleep_max;
        self
    }

    fn api_json<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        request: &Value,
    ) -> Result<T> {
        let url = urljoin(&self.url, operation);
        let resp = self.robust_request(|| self.http.post(&url).json(request).send())?;

        let status = resp.status();
        let text = resp.text().unwrap_or_default();
        if !status.is_success() {
            return Err(classify_fault(status, &url, &text));
        }

        serde_json::from_str::<T>(&text).map_err(|e| RegistryError::Parse {
            url,
            message: e.to_string(),
        })
    }

    fn robust_request<F>(&self, mut f: F) -> Result<Response>
    where
        F: FnMut() -> std::result::Result<Response, reqwest::Error>,
    {
        let mut tries = 0usize;
        let mut sleep = Duration::from_secs(1);
        loop {
            match f() {
                Ok(resp) => {
                    if retriable_status(resp.status().as_u16()) {
                        tries += 1;
                        if tries >= self.retry_max {
                            return Ok(resp);
                        }
                        thread::sleep(sleep);
                        sleep = backoff(sleep, self.sleep_max);
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    // timeouts / transient connection errors
                    tries += 1;
                    if tries >= self.retry_max {
                        return Err(RegistryError::Network(err));
                    }
                    thread::sleep(sleep);
                    sleep = backoff(sleep, self.sleep_max);
                }
            }
        }
    }
}

impl UnitSource for Client {
    fn list_page(&self, offset: usize, limit: usize) -> Result<Vec<UnitRecord>> {
        let request = json!({
            "apiKey": self.api_key,
            "marktakteurMastrNummer": self.mastr_number,
            "startAb": offset,
            "limit": limit,
        });
        let reply: ListReply = self.api_json("GetListeAlleEinheiten", &request)?;
        if let Some(code) = &reply.code {
            debug!(%code, offset, units = reply.units.len(), "list page fetched");
        }
        Ok(reply.units)
    }

    fn unit_detail(&self, unit_number: &str) -> Result<UnitRecord> {
        let request = json!({
            "apiKey": self.api_key,
            "marktakteurMastrNummer": self.mastr_number,
            "einheitMastrNummer": unit_number,
        });
        self.api_json("GetEinheitSolar", &request)
    }
}
