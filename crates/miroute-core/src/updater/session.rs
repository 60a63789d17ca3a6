use chrono::{DateTime, Utc};
use miroute_api::LuciApi;
use tracing::warn;

/// Login state for one router.
///
/// The updater drives it: a cycle begins by ensuring a session exists
/// and may spend its single re-login allowance when the router rejects
/// the token mid-cycle.
#[derive(Debug, Default)]
pub(crate) struct Session {
    authenticated: bool,
    last_login: Option<DateTime<Utc>>,
    relogin_spent: bool,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.last_login
    }

    /// Resets the per-cycle re-login allowance.
    pub fn begin_cycle(&mut self) {
        self.relogin_spent = false;
    }

    /// Forgets the session without talking to the router. Used when a
    /// fetch comes back with a token rejection.
    pub fn invalidate(&mut self) {
        self.authenticated = false;
    }

    /// True at most once per cycle. A second token rejection in the
    /// same cycle fails the cycle instead of hammering the login
    /// endpoint.
    pub fn take_relogin_allowance(&mut self) -> bool {
        if self.relogin_spent {
            false
        } else {
            self.relogin_spent = true;
            true
        }
    }

    /// Logs in unless a session is already live. Transient failures
    /// get one immediate retry; a rejected password does not.
    pub async fn ensure<C: LuciApi + ?Sized>(
        &mut self,
        client: &C,
    ) -> Result<(), miroute_api::Error> {
        if self.authenticated {
            return Ok(());
        }
        if let Err(first) = client.login().await {
            if matches!(first, miroute_api::Error::Authentication { .. }) {
                return Err(first);
            }
            warn!(error = %first, "login failed, retrying once");
            client.login().await?;
        }
        self.authenticated = true;
        self.last_login = Some(Utc::now());
        Ok(())
    }

    /// Best-effort logout. The session is considered gone regardless
    /// of whether the router acknowledged it.
    pub async fn shutdown<C: LuciApi + ?Sized>(&mut self, client: &C) {
        if !self.authenticated {
            return;
        }
        if let Err(err) = client.logout().await {
            warn!(error = %err, "logout failed");
        }
        self.authenticated = false;
    }
}
