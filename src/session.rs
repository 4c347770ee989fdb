use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use url::Url;

use crate::domain::credential::{IDENTITY_KEYS, Identity, TOKEN_KEY, token_is_usable};
use crate::error::AppResult;
use crate::services::{Navigator, SessionStore};

const REDIRECT_PARAM: &str = "redirect";

/// Owns the session lifecycle. Every 401 from any realm ends up in
/// [`SessionGuard::on_unauthorized`]; once the session has been torn down,
/// further 401s are absorbed until a new identity is established.
pub struct SessionGuard {
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    signin_url: Url,
    torn_down: AtomicBool,
}

impl SessionGuard {
    pub fn new(
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
        signin_url: Url,
    ) -> Self {
        Self {
            store,
            navigator,
            signin_url,
            torn_down: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn redirect_target(&self, location: &str) -> Url {
        let mut target = self.signin_url.clone();
        target.query_pairs_mut().append_pair(REDIRECT_PARAM, location);
        target
    }

    /// Clears the persisted identity and sends the user to sign in. Returns
    /// false when the session had already been torn down.
    pub fn on_unauthorized(&self) -> bool {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            tracing::debug!("session already invalidated; skipping redirect");
            return false;
        }

        self.clear_identity();

        let location = self.navigator.current_location();
        let target = self.redirect_target(&location);
        tracing::warn!(%target, "session rejected; redirecting to sign-in");
        self.navigator.redirect(&target);
        true
    }

    /// Startup check: proceed only with a present, unexpired credential.
    pub fn check_auth_and_redirect(&self) -> bool {
        self.check_auth_at(Utc::now())
    }

    fn check_auth_at(&self, now: DateTime<Utc>) -> bool {
        let usable = self
            .store
            .get(TOKEN_KEY)
            .is_some_and(|token| token_is_usable(&token, now));
        if usable {
            return true;
        }
        tracing::info!("no usable credential at startup");
        self.on_unauthorized();
        false
    }

    /// Replaces whatever identity was stored with `identity` and re-arms the
    /// 401 handling.
    pub fn establish(&self, identity: &Identity) -> AppResult<()> {
        for key in IDENTITY_KEYS {
            self.store.remove(key)?;
        }
        for (key, value) in identity.entries() {
            self.store.set(key, &value)?;
        }
        self.torn_down.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Local sign-out; no redirect.
    pub fn sign_out(&self) -> AppResult<()> {
        self.store.clear_all()
    }

    fn clear_identity(&self) {
        if let Err(err) = self.store.clear_all() {
            tracing::warn!(error = %err, "failed to clear session store; removing keys one by one");
            for key in IDENTITY_KEYS {
                if let Err(err) = self.store.remove(key) {
                    tracing::warn!(key, error = %err, "failed to remove session key");
                }
            }
        }
    }
}
