// Luci HTTP client
//
// Wraps `reqwest::Client` with MiWiFi-specific URL construction and
// envelope unwrapping. The session token rides in the URL path as
// `;stok={token}`, not in a cookie, so the client stores it and splices
// it into every authenticated request. Endpoint calls live in
// `endpoints.rs` as inherent methods; the login handshake in `auth.rs`.

use std::sync::RwLock;

use secrecy::SecretString;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw HTTP client for a single MiWiFi router's Luci API.
///
/// Handles the flat `{ "code": N, ... }` envelope: payload fields are
/// siblings of `code`, so responses are checked for `code == 0` first
/// and then decoded as a whole into the typed payload.
pub struct LuciClient {
    http: reqwest::Client,
    host: String,
    base_url: Url,
    pub(crate) password: SecretString,
    /// Random 12-hex client identity baked into login nonces.
    pub(crate) device_id: String,
    token: RwLock<Option<String>>,
}

impl LuciClient {
    /// Create a client for the router at `host` (IP or hostname).
    pub fn new(
        host: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let host = host.into();
        let base_url = Url::parse(&format!("http://{host}/cgi-bin/luci"))?;
        let http = transport.build_client()?;
        let device_id = format!("{:012x}", rand::random::<u64>() & 0xffff_ffff_ffff);
        Ok(Self {
            http,
            host,
            base_url,
            password,
            device_id,
            token: RwLock::new(None),
        })
    }

    /// The router host this client talks to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The underlying HTTP client (used by the icon fetch).
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Token management ─────────────────────────────────────────────

    /// Whether a session token is currently stored.
    pub fn has_token(&self) -> bool {
        self.token.read().expect("token lock poisoned").is_some()
    }

    pub(crate) fn set_token(&self, token: String) {
        *self.token.write().expect("token lock poisoned") = Some(token);
    }

    pub(crate) fn take_token(&self) -> Option<String> {
        self.token.write().expect("token lock poisoned").take()
    }

    fn current_token(&self) -> Option<String> {
        self.token.read().expect("token lock poisoned").clone()
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/;stok={token}/api/{path}` for authenticated calls,
    /// or `{base}/api/{path}` when no token is given.
    pub(crate) fn api_url(&self, path: &str, token: Option<&str>) -> Url {
        let base = self.base_url.as_str().trim_end_matches('/');
        let full = match token {
            Some(token) => format!("{base}/;stok={token}/api/{path}"),
            None => format!("{base}/api/{path}"),
        };
        Url::parse(&full).expect("invalid API URL")
    }

    /// Build `{base}/;stok={token}/web/{path}` (the logout endpoint
    /// lives under `web/`, not `api/`).
    pub(crate) fn web_url(&self, path: &str, token: &str) -> Url {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/;stok={token}/web/{path}")).expect("invalid web URL")
    }

    /// Build a URL directly under the router's web root (static assets).
    pub(crate) fn root_url(&self, path: &str) -> Url {
        Url::parse(&format!("http://{}/{path}", self.host)).expect("invalid root URL")
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send an authenticated GET and unwrap the envelope.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let token = self.current_token().ok_or(Error::NotAuthenticated)?;
        let url = self.api_url(path, Some(&token));
        debug!(%path, "GET");

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        self.parse_envelope(resp).await
    }

    /// Send an unauthenticated GET (only the login probe uses this).
    pub(crate) async fn get_unauth<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.api_url(path, None);
        debug!(%path, "GET (unauthenticated)");

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        self.parse_envelope(resp).await
    }

    /// Send an unauthenticated form POST (the login call) and unwrap
    /// the envelope.
    pub(crate) async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T, Error> {
        let url = self.api_url(path, None);
        debug!(%path, "POST");

        let resp = self
            .http
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(Error::Transport)?;
        self.parse_envelope(resp).await
    }

    /// Parse the flat `{ code, ... }` envelope.
    ///
    /// `code == 0` decodes the whole object into `T`; `code == 401`
    /// clears the stored token and reports the session as expired;
    /// anything else becomes `Error::Api`.
    async fn parse_envelope<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let resp = resp.error_for_status().map_err(Error::Transport)?;
        let body = resp.text().await.map_err(Error::Transport)?;

        let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })?;

        let code = value.get("code").and_then(serde_json::Value::as_i64);
        match code {
            Some(0) => serde_json::from_value(value).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body,
            }),
            Some(401) => {
                self.take_token();
                Err(Error::TokenExpired)
            }
            Some(code) => Err(Error::Api {
                code,
                message: value
                    .get("msg")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("unknown error")
                    .to_owned(),
            }),
            None => Err(Error::Deserialization {
                message: "response has no `code` field".into(),
                body,
            }),
        }
    }
}

impl std::fmt::Debug for LuciClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuciClient")
            .field("host", &self.host)
            .field("authenticated", &self.has_token())
            .finish_non_exhaustive()
    }
}
