//! Shared state handed to every route

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use contentforge_core::auth::AuthClient;
use contentforge_core::prelude::*;

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<Generator>,
    pub store: Arc<dyn GenerationStore>,
    /// Present when hosted auth credentials are configured
    pub auth: Option<AuthClient>,
    pub require_auth: bool,
    pub list_limit: u32,
    pub body_limit: usize,
}

impl AppState {
    pub fn new(
        generator: Generator,
        store: Arc<dyn GenerationStore>,
        auth: Option<AuthClient>,
        config: &Config,
    ) -> Self {
        Self {
            generator: Arc::new(generator),
            store,
            auth,
            require_auth: config.auth.require_auth,
            list_limit: config.storage.list_limit,
            body_limit: config.server.body_limit_bytes,
        }
    }

    /// The auth client, or a configuration error when none is set up
    pub fn auth_client(&self) -> Result<&AuthClient> {
        self.auth.as_ref().ok_or_else(|| {
            Error::ConfigError("Missing Supabase environment variables".to_string())
        })
    }

    /// The store, scoped to the caller's token when one was sent
    pub fn store_for(&self, headers: &HeaderMap) -> Arc<dyn GenerationStore> {
        match bearer_token(headers) {
            Some(token) => self.store.clone().with_access_token(token),
            None => self.store.clone(),
        }
    }
}

/// Token from an `Authorization: Bearer ...` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
