//! PAN-OS REST API backend.
//!
//! Entries are addressed as `{base}/restapi/{version}/{endpoint}` with the
//! scope and entry name passed as query parameters. Each object kind maps to
//! one endpoint (e.g. `address` → `Objects/Addresses`); kinds must be
//! registered with [`RestBackend::with_endpoint`] before use.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::location::Scope;
use crate::types::{CallContext, WireEntry};
use serde::{Deserialize, Serialize};
use serde_json::{Value as Json, json};
use std::collections::HashMap;
use std::time::Duration;

/// Default REST API version.
pub const DEFAULT_API_VERSION: &str = "v10.2";

/// Connection settings for the REST backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestConfig {
    pub hostname: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub skip_verify_certificate: bool,
}

fn default_protocol() -> String {
    "https".to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl RestConfig {
    /// Settings for `hostname` with an API key and defaults elsewhere.
    pub fn new(hostname: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            protocol: default_protocol(),
            port: None,
            api_key: api_key.into(),
            api_version: default_api_version(),
            skip_verify_certificate: false,
        }
    }

    /// Base URL of the REST API, without a trailing slash.
    pub fn base_url(&self) -> String {
        match self.port {
            Some(port) => format!(
                "{}://{}:{}/restapi/{}",
                self.protocol, self.hostname, port, self.api_version
            ),
            None => format!(
                "{}://{}/restapi/{}",
                self.protocol, self.hostname, self.api_version
            ),
        }
    }
}

/// Backend talking to a live device over the REST API.
pub struct RestBackend {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    endpoints: HashMap<String, String>,
}

impl RestBackend {
    /// Create a backend from connection settings.
    pub fn new(config: &RestConfig) -> Result<Self> {
        if config.hostname.trim().is_empty() {
            return Err(Error::Other("hostname is not configured".to_string()));
        }
        if config.api_key.trim().is_empty() {
            return Err(Error::Other("API key is not configured".to_string()));
        }

        let mut builder = ureq::Agent::config_builder().http_status_as_error(false);
        if config.skip_verify_certificate {
            builder = builder.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }
        let agent: ureq::Agent = builder.build().into();

        Ok(Self {
            agent,
            base_url: config.base_url(),
            api_key: config.api_key.clone(),
            endpoints: HashMap::new(),
        })
    }

    /// Register the endpoint serving an object kind.
    pub fn with_endpoint(mut self, kind: &str, endpoint: &str) -> Self {
        self.endpoints.insert(kind.to_string(), endpoint.to_string());
        self
    }

    /// Register several kind → endpoint pairs.
    pub fn with_endpoints<'a>(mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        for (kind, endpoint) in pairs {
            self.endpoints.insert(kind.to_string(), endpoint.to_string());
        }
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, kind: &str, action: Option<&str>) -> Result<String> {
        let endpoint = self
            .endpoints
            .get(kind)
            .ok_or_else(|| Error::Other(format!("no REST endpoint registered for {kind}")))?;
        Ok(match action {
            Some(action) => format!("{}/{}:{}", self.base_url, endpoint, action),
            None => format!("{}/{}", self.base_url, endpoint),
        })
    }

    fn query(scope: &Scope, name: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = scope.query_params();
        if let Some(name) = name {
            params.push(("name", name.to_string()));
        }
        params
    }

    fn send(
        &self,
        ctx: &CallContext,
        method: Method,
        url: &str,
        params: &[(&'static str, String)],
        body: Option<&Json>,
    ) -> Result<(u16, Json)> {
        ctx.cancel.check()?;
        log::trace!("{} {} {:?}", method.as_str(), url, params);

        let timeout = ctx.timeout;
        let mut response = match (method, body) {
            (Method::Get, _) => {
                let mut request = self
                    .agent
                    .get(url)
                    .config()
                    .timeout_global(timeout)
                    .build()
                    .header("X-PAN-KEY", &self.api_key);
                for (key, value) in params {
                    request = request.query(*key, value);
                }
                request.call()?
            }
            (Method::Delete, _) => {
                let mut request = self
                    .agent
                    .delete(url)
                    .config()
                    .timeout_global(timeout)
                    .build()
                    .header("X-PAN-KEY", &self.api_key);
                for (key, value) in params {
                    request = request.query(*key, value);
                }
                request.call()?
            }
            (Method::Post | Method::Put, body) => {
                let mut request = if method == Method::Post {
                    self.agent.post(url)
                } else {
                    self.agent.put(url)
                }
                .config()
                .timeout_global(timeout)
                .build()
                .header("X-PAN-KEY", &self.api_key);
                for (key, value) in params {
                    request = request.query(*key, value);
                }
                match body {
                    Some(body) => request.send_json(body)?,
                    None => request.send_empty()?,
                }
            }
        };

        let status = response.status().as_u16();
        let text = response.body_mut().read_to_string()?;
        let body = if text.trim().is_empty() {
            Json::Null
        } else {
            serde_json::from_str(&text)?
        };
        Ok((status, body))
    }

    /// Turn a response into entries, or the error it carries.
    fn check(status: u16, body: Json, kind: &str, name: Option<&str>) -> Result<Vec<WireEntry>> {
        if let Some(error) = api_error(status, &body, kind, name) {
            return Err(error);
        }
        let entries = match body.pointer("/result/entry") {
            Some(Json::Array(entries)) => entries.clone(),
            Some(entry @ Json::Object(_)) => vec![entry.clone()],
            _ => Vec::new(),
        };
        entries.into_iter().map(WireEntry::from_json).collect()
    }
}

impl std::fmt::Debug for RestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBackend")
            .field("base_url", &self.base_url)
            .field("endpoints", &self.endpoints.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Error body returned by the REST API.
#[derive(Debug, Deserialize)]
struct ApiError {
    code: Json,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    causes: Vec<ApiErrorCause>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorCause {
    #[serde(default)]
    description: String,
}

fn api_error(status: u16, body: &Json, kind: &str, name: Option<&str>) -> Option<Error> {
    let succeeded = body.get("@status").and_then(Json::as_str) == Some("success");
    if succeeded && status < 400 {
        return None;
    }

    if let Ok(error) = serde_json::from_value::<ApiError>(body.clone()) {
        let code = match &error.code {
            Json::Number(n) => n.as_u64().unwrap_or_default(),
            Json::String(s) => s.parse().unwrap_or_default(),
            _ => 0,
        };
        let causes: Vec<&str> = error
            .details
            .iter()
            .flat_map(|d| d.causes.iter())
            .map(|c| c.description.trim())
            .filter(|d| !d.is_empty())
            .collect();
        let message = if causes.is_empty() {
            error.message.clone()
        } else {
            causes.join("; ")
        };
        return Some(Error::from_api_error(
            u32::try_from(code).unwrap_or(u32::MAX),
            &message,
            kind,
            name,
        ));
    }

    if status >= 400 {
        return Some(Error::transport(format!("HTTP {status}"), Some(status)));
    }
    body.get("@status")
        .and_then(Json::as_str)
        .map(|s| Error::transport(format!("unexpected API status '{s}'"), Some(status)))
}

impl Backend for RestBackend {
    fn name(&self) -> &'static str {
        "rest"
    }

    fn read(&self, ctx: &CallContext, scope: &Scope, kind: &str, name: &str) -> Result<WireEntry> {
        let url = self.url(kind, None)?;
        let (status, body) = self.send(ctx, Method::Get, &url, &Self::query(scope, Some(name)), None)?;
        Self::check(status, body, kind, Some(name))?
            .into_iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| Error::not_found(kind, name))
    }

    fn create(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        entry: &WireEntry,
    ) -> Result<WireEntry> {
        let url = self.url(kind, None)?;
        let body = json!({ "entry": entry.to_json() });
        let (status, response) = self.send(
            ctx,
            Method::Post,
            &url,
            &Self::query(scope, Some(&entry.name)),
            Some(&body),
        )?;
        Self::check(status, response, kind, Some(&entry.name))?;
        Ok(entry.clone())
    }

    fn update(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        name: &str,
        entry: &WireEntry,
    ) -> Result<WireEntry> {
        let url = self.url(kind, None)?;
        let updated = entry.renamed(name);
        let body = json!({ "entry": updated.to_json() });
        let (status, response) = self.send(
            ctx,
            Method::Put,
            &url,
            &Self::query(scope, Some(name)),
            Some(&body),
        )?;
        Self::check(status, response, kind, Some(name))?;
        Ok(updated)
    }

    fn delete(&self, ctx: &CallContext, scope: &Scope, kind: &str, name: &str) -> Result<()> {
        let url = self.url(kind, None)?;
        let (status, response) =
            self.send(ctx, Method::Delete, &url, &Self::query(scope, Some(name)), None)?;
        Self::check(status, response, kind, Some(name))?;
        Ok(())
    }

    fn rename(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        let url = self.url(kind, Some("rename"))?;
        let mut params = Self::query(scope, Some(old_name));
        params.push(("newname", new_name.to_string()));
        let (status, response) = self.send(ctx, Method::Post, &url, &params, None)?;
        // A collision on rename is reported against the target name.
        match Self::check(status, response, kind, Some(old_name)) {
            Err(Error::AlreadyExists { .. }) => Err(Error::already_exists(new_name)),
            other => other.map(|_| ()),
        }
    }

    fn list(
        &self,
        ctx: &CallContext,
        scope: &Scope,
        kind: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<WireEntry>> {
        let url = self.url(kind, None)?;
        let (status, body) = self.send(ctx, Method::Get, &url, &Self::query(scope, None), None)?;
        let entries = match Self::check(status, body, kind, None) {
            Err(Error::NotFound { .. }) => Vec::new(),
            other => other?,
        };
        Ok(entries
            .into_iter()
            .filter(|entry| prefix.is_none_or(|p| entry.name.starts_with(p)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> RestBackend {
        RestBackend::new(&RestConfig::new("fw.example.com", "secret"))
            .unwrap()
            .with_endpoint("address", "Objects/Addresses")
    }

    #[test]
    fn test_base_url() {
        let mut config = RestConfig::new("fw.example.com", "k");
        assert_eq!(config.base_url(), "https://fw.example.com/restapi/v10.2");
        config.port = Some(8443);
        config.protocol = "http".to_string();
        assert_eq!(config.base_url(), "http://fw.example.com:8443/restapi/v10.2");
    }

    #[test]
    fn test_requires_credentials() {
        assert!(RestBackend::new(&RestConfig::new("", "k")).is_err());
        assert!(RestBackend::new(&RestConfig::new("fw", "")).is_err());
    }

    #[test]
    fn test_url_for_kind() {
        let backend = backend();
        assert_eq!(
            backend.url("address", None).unwrap(),
            "https://fw.example.com/restapi/v10.2/Objects/Addresses"
        );
        assert_eq!(
            backend.url("address", Some("rename")).unwrap(),
            "https://fw.example.com/restapi/v10.2/Objects/Addresses:rename"
        );
        assert!(backend.url("tag", None).is_err());
    }

    #[test]
    fn test_check_success_entries() {
        let body = json!({
            "@status": "success",
            "@code": "19",
            "result": {
                "@total-count": "1",
                "@count": "1",
                "entry": [{"@name": "a1", "@location": "shared", "ip-netmask": "10.0.0.1/32"}]
            }
        });
        let entries = RestBackend::check(200, body, "address", Some("a1")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a1");
    }

    #[test]
    fn test_check_not_found() {
        let body = json!({"code": 5, "message": "Object Not Present", "details": []});
        let err = RestBackend::check(404, body, "address", Some("a1")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_check_validation_uses_causes() {
        let body = json!({
            "code": 3,
            "message": "Invalid Object",
            "details": [{
                "@type": "CauseInfo",
                "causes": [{"code": 12, "module": "panui_mgmt", "description": "g1 -> static 'x' is not a valid reference"}]
            }]
        });
        let err = RestBackend::check(400, body, "address_group", Some("g1")).unwrap_err();
        assert_eq!(err.to_string(), "g1 -> static 'x' is not a valid reference");
    }

    #[test]
    fn test_check_string_code() {
        let body = json!({"code": "6", "message": "Object Not Unique"});
        let err = RestBackend::check(409, body, "address", Some("a1")).unwrap_err();
        assert_eq!(err.to_string(), "entry 'a1' already exists");
    }

    #[test]
    fn test_check_bare_http_error() {
        let err = RestBackend::check(502, Json::Null, "address", None).unwrap_err();
        assert!(matches!(err, Error::Transport { status: Some(502), .. }));
    }
}
