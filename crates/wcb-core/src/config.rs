use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Typed configuration for the bridge, loaded from the environment
/// (with optional `.env` file support).
#[derive(Clone, Debug)]
pub struct Config {
    // Inbound transport
    pub allowed_senders: Vec<String>,
    pub webhook_addr: String,
    pub wa_verify_token: String,

    // Outbound transport (Graph API)
    pub wa_access_token: String,
    pub wa_phone_number_id: String,
    pub graph_api_base: String,

    // Catalog backend
    pub catalog_submit_url: String,
    /// When unset, vendor registration is log-only.
    pub catalog_vendor_url: Option<String>,

    // Control vocabulary
    pub flush_marker: String,
    pub start_command: String,

    // Deadlines
    pub submit_timeout: Duration,
    pub media_timeout: Duration,

    // Audit
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let allowed_senders = parse_csv(env_str("WA_ALLOWED_SENDERS"));
        if allowed_senders.is_empty() {
            return Err(Error::Config(
                "WA_ALLOWED_SENDERS environment variable is required".to_string(),
            ));
        }

        let wa_verify_token = require("WA_VERIFY_TOKEN")?;
        let wa_access_token = require("WA_ACCESS_TOKEN")?;
        let wa_phone_number_id = require("WA_PHONE_NUMBER_ID")?;

        let webhook_addr = env_str("WCB_WEBHOOK_ADDR").unwrap_or_else(|| "0.0.0.0:8080".into());
        let graph_api_base = env_str("WA_GRAPH_API_BASE")
            .unwrap_or_else(|| "https://graph.facebook.com/v19.0".into());

        let catalog_submit_url = env_str("CATALOG_SUBMIT_URL")
            .unwrap_or_else(|| "http://localhost:8000/api/add-product/".into());
        let catalog_vendor_url = env_str("CATALOG_VENDOR_URL").and_then(non_empty);

        let flush_marker = env_str("WCB_FLUSH_MARKER").unwrap_or_else(|| "✅".into());
        let start_command = env_str("WCB_START_COMMAND").unwrap_or_else(|| "!product".into());

        let submit_timeout =
            Duration::from_millis(env_u64("CATALOG_TIMEOUT_MS").unwrap_or(15_000));
        let media_timeout = Duration::from_millis(env_u64("MEDIA_TIMEOUT_MS").unwrap_or(20_000));

        let audit_log_path =
            PathBuf::from(env_str("AUDIT_LOG_PATH").unwrap_or("/tmp/wcb-audit.log".to_string()));
        let audit_log_json = env_bool("AUDIT_LOG_JSON").unwrap_or(true);

        Ok(Self {
            allowed_senders,
            webhook_addr,
            wa_verify_token,
            wa_access_token,
            wa_phone_number_id,
            graph_api_base,
            catalog_submit_url,
            catalog_vendor_url,
            flush_marker,
            start_command,
            submit_timeout,
            media_timeout,
            audit_log_path,
            audit_log_json,
        })
    }
}

fn require(key: &str) -> Result<String> {
    env_str(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn parse_csv(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_parsing_trims_and_skips_empties() {
        let got = parse_csv(Some(" a@c.us, ,b@g.us ,".to_string()));
        assert_eq!(got, vec!["a@c.us".to_string(), "b@g.us".to_string()]);
        assert!(parse_csv(None).is_empty());
    }
}
