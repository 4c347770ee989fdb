use std::sync::Arc;

use reqwest::{
    Client, Method, StatusCode,
    header::{ACCEPT, CONTENT_TYPE},
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::credential::{fingerprint, sanitize_token};
use crate::error::{AppError, AppResult, RequestFailure};
use crate::session::SessionGuard;

/// One API surface: where it lives and which session key holds its
/// credential.
#[derive(Debug, Clone)]
pub struct Realm {
    pub name: String,
    pub base_url: String,
    pub credential_key: String,
}

impl Realm {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        credential_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            credential_key: credential_key.into(),
        }
    }
}

/// Authenticated JSON requests against a single realm. A 401 from the
/// realm tears the session down through the [`SessionGuard`] before the
/// error is handed back.
pub struct RequestGateway {
    http: Client,
    realm: Realm,
    guard: Arc<SessionGuard>,
}

impl RequestGateway {
    pub fn new(http: Client, realm: Realm, guard: Arc<SessionGuard>) -> Self {
        Self { http, realm, guard }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.realm.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn credential(&self) -> Option<String> {
        self.guard
            .store()
            .get(&self.realm.credential_key)
            .and_then(|raw| sanitize_token(&raw))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        self.request(Method::GET, path, None::<&()>).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PATCH, path, Some(body)).await
    }

    /// DELETE; any response body is ignored.
    pub async fn delete(&self, path: &str) -> AppResult<()> {
        self.send(Method::DELETE, path, None::<&()>).await?;
        Ok(())
    }

    pub async fn request<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let text = self.send(method, path, body).await?;
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|err| AppError::Decode {
            realm: self.realm.name.clone(),
            message: err.to_string(),
        })
    }

    async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> AppResult<String>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");

        match self.credential() {
            Some(token) => {
                tracing::debug!(
                    realm = %self.realm.name,
                    %method,
                    %url,
                    credential = %fingerprint(&token),
                    "sending request"
                );
                request = request.bearer_auth(token);
            }
            None => {
                tracing::debug!(realm = %self.realm.name, %method, %url, "sending unauthenticated request");
            }
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|err| {
            AppError::Request(RequestFailure::network(format!(
                "failed to call {}: {err}",
                self.realm.name
            )))
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(realm = %self.realm.name, %method, %url, "credential rejected");
            self.guard.on_unauthorized();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Unauthorized(RequestFailure::from_response(
                status.as_u16(),
                &text,
            )));
        }

        let text = response.text().await.map_err(|err| {
            AppError::Request(RequestFailure::network(format!(
                "failed to read response from {}: {err}",
                self.realm.name
            )))
        })?;

        if !status.is_success() {
            tracing::warn!(realm = %self.realm.name, %method, %url, %status, "request failed");
            return Err(AppError::Request(RequestFailure::from_response(
                status.as_u16(),
                &text,
            )));
        }

        Ok(text)
    }
}
