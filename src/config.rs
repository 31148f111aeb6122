use std::path::{Path, PathBuf};

use crate::client::ClientConfig;
use crate::error::{RegistryError, Result};

/// Base URL of the registry's JSON endpoints.
pub const DEFAULT_API_URL: &str = "https://www.marktstammdatenregister.de/MaStRAPI/json";

#[derive(Debug, Default)]
struct RcConfig {
    url: Option<String>,
    key: Option<String>,
    number: Option<String>,
}

pub(crate) fn load_config(
    url: Option<String>,
    key: Option<String>,
    number: Option<String>,
) -> Result<ClientConfig> {
    let mut url = url.or_else(|| std::env::var("MASTR_API_URL").ok());
    let mut key = key.or_else(|| std::env::var("API_KEY").ok());
    let mut number = number.or_else(|| std::env::var("MASTR_NUMBER").ok());

    let rc_candidates = rc_candidates();

    if url.is_none() || key.is_none() || number.is_none() {
        for rc_path in &rc_candidates {
            if rc_path.exists() {
                let cfg = read_rc(rc_path).map_err(|e| {
                    RegistryError::Credential(format!(
                        "failed to read configuration file {}: {}",
                        rc_path.display(),
                        e
                    ))
                })?;

                if url.is_none() {
                    url = cfg.url;
                }
                if key.is_none() {
                    key = cfg.key;
                }
                if number.is_none() {
                    number = cfg.number;
                }
                break;
            }
        }
    }

    let key = match key {
        Some(v) if !v.trim().is_empty() => v,
        _ => return Err(missing("API key", "--api-key", "API_KEY", "key", &rc_candidates)),
    };

    let number = match number {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            return Err(missing(
                "MaStR number",
                "--mastr-number",
                "MASTR_NUMBER",
                "number",
                &rc_candidates,
            ));
        }
    };

    Ok(ClientConfig {
        url: url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        api_key: key,
        mastr_number: number,
    })
}

fn missing(
    what: &str,
    flag: &str,
    env: &str,
    rc_key: &str,
    rc_candidates: &[PathBuf],
) -> RegistryError {
    RegistryError::Credential(format!(
        "Missing configuration: {} (pass {}, set {}, or put `{}:` in one of: {})",
        what,
        flag,
        env,
        rc_key,
        rc_candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    ))
}

fn read_rc(path: &Path) -> std::io::Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    let mut cfg = RcConfig::default();

    // Tolerate `key:` on one line with the token on the next line.
    let mut pending_key: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pk) = pending_key {
            if !line.contains(':') {
                let v = strip_quotes(line);
                match pk {
                    "url" => cfg.url = Some(v.to_string()),
                    "key" => cfg.key = Some(v.to_string()),
                    "number" => cfg.number = Some(v.to_string()),
                    _ => {}
                }
                pending_key = None;
                continue;
            }
            pending_key = None;
        }

        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = strip_quotes(v.trim());
            match k {
                "url" => {
                    if !v.is_empty() {
                        cfg.url = Some(v.to_string());
                    } else {
                        pending_key = Some("url");
                    }
                }
                "key" => {
                    if !v.is_empty() {
                        cfg.key = Some(v.to_string());
                    } else {
                        pending_key = Some("key");
                    }
                }
                "number" => {
                    if !v.is_empty() {
                        cfg.number = Some(v.to_string());
                    } else {
                        pending_key = Some("number");
                    }
                }
                _ => {}
            }
        }
    }

    Ok(cfg)
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // Search order:
    // 1) MASTR_RC (explicit)
    // 2) ./.mastrrc (current working directory)
    // 3) ~/.mastrrc
    if let Ok(p) = std::env::var("MASTR_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".mastrrc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".mastrrc"));
    }
    v
}
