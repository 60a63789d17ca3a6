// Luci authentication
//
// The MiWiFi login is a challenge handshake rather than a plain
// credential POST: the client invents a nonce, hashes the password
// against a fixed public key and the nonce, and receives a session
// token that must be spliced into every subsequent URL.

use rand::Rng;
use secrecy::ExposeSecret;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::client::LuciClient;
use crate::error::Error;
use crate::models::{InitInfo, LoginResponse};

/// Key the stock firmware mixes into every password hash. Shared by all
/// MiWiFi devices; not a secret.
const PUBLIC_KEY: &str = "a2ffa5c9be07488bbb04a3a47d3c5f6a";

impl LuciClient {
    /// Authenticate with the router.
    ///
    /// `POST /api/xqsystem/login`
    ///
    /// Probes `xqsystem/init_info` (which answers without a token) to
    /// learn whether this firmware uses the SHA-256 hash chain; older
    /// firmware falls back to SHA-1. On success the returned token is
    /// stored for URL construction.
    pub async fn login(&self) -> Result<(), Error> {
        let new_encrypt = match self.get_unauth::<InitInfo>("xqsystem/init_info").await {
            Ok(info) => info.uses_new_encrypt(),
            Err(err) => {
                debug!(error = %err, "init_info probe failed, assuming legacy hash mode");
                false
            }
        };

        let nonce = self.generate_nonce();
        let hash = self.password_hash(&nonce, new_encrypt);

        let form = [
            ("username", "admin"),
            ("logtype", "2"),
            ("password", hash.as_str()),
            ("nonce", nonce.as_str()),
        ];

        let resp: LoginResponse = self
            .post_form("xqsystem/login", &form)
            .await
            .map_err(|err| match err {
                Error::Api { code, message } => Error::Authentication {
                    message: format!("login rejected (code {code}): {message}"),
                },
                Error::TokenExpired => Error::Authentication {
                    message: "login rejected".into(),
                },
                other => other,
            })?;

        self.set_token(resp.token);
        info!(host = %self.host(), "logged in");
        Ok(())
    }

    /// End the current session.
    ///
    /// `GET /;stok={token}/web/logout`
    ///
    /// The stored token is cleared even when the request fails; the
    /// router may already have dropped the session on its side.
    pub async fn logout(&self) -> Result<(), Error> {
        let Some(token) = self.take_token() else {
            return Ok(());
        };

        let url = self.web_url("logout", &token);
        debug!("logging out");

        let resp = self.http().get(url).send().await.map_err(Error::Transport)?;
        resp.error_for_status().map_err(Error::Transport)?;

        debug!("logout complete");
        Ok(())
    }

    /// Nonce format the firmware expects: `0_{device_id}_{unix_ts}_{salt}`.
    fn generate_nonce(&self) -> String {
        let ts = chrono::Utc::now().timestamp();
        let salt: u32 = rand::thread_rng().gen_range(1000..10_000);
        format!("0_{}_{ts}_{salt}", self.device_id)
    }

    /// Challenge hash: `H(nonce + H(password + PUBLIC_KEY))`, hex-encoded,
    /// where `H` is SHA-256 on new firmware and SHA-1 otherwise.
    fn password_hash(&self, nonce: &str, new_encrypt: bool) -> String {
        let password = self.password.expose_secret();
        if new_encrypt {
            let inner = hex::encode(Sha256::digest(format!("{password}{PUBLIC_KEY}")));
            hex::encode(Sha256::digest(format!("{nonce}{inner}")))
        } else {
            let inner = hex::encode(Sha1::digest(format!("{password}{PUBLIC_KEY}")));
            hex::encode(Sha1::digest(format!("{nonce}{inner}")))
        }
    }
}
