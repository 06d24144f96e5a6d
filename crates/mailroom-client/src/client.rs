//! HTTP client for the `/api` surface.

use mailroom_core::models::audit::AuditLogEntry;
use mailroom_core::models::domain::{CreateDomain, Domain};
use mailroom_core::models::message::{CreateMessage, Folder, Message, MessageStatus};
use mailroom_core::models::user::{CreateUser, Role, UpdateUser, User, UserStats};
use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::cache::QueryCache;
use crate::error::{ClientError, ErrorBody};

const USERS: &str = "/api/users";
const CURRENT_USER: &str = "/api/user";
const EMAILS: &str = "/api/emails";
const DOMAINS: &str = "/api/domains";
const AUDIT_LOGS: &str = "/api/audit-logs";

/// Filters for [`ApiClient::audit_logs`].
#[derive(Debug, Clone, Default)]
pub struct AuditLogQuery {
    pub limit: Option<u64>,
    pub action: Option<String>,
    pub actor_id: Option<Uuid>,
    pub target_user_id: Option<Uuid>,
}

/// Session-holding API client. The session cookie lives in the
/// client's cookie store.
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    cache: QueryCache,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base_url).map_err(|e| ClientError::Url(e.to_string()))?;
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base,
            cache: QueryCache::new(),
        })
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    // -- session --------------------------------------------------------

    pub async fn login(&self, username: &str, password: &str) -> Result<User, ClientError> {
        let user = self
            .send(
                Method::POST,
                "/api/login",
                Some(&json!({ "username": username, "password": password })),
            )
            .await?;
        // A different principal sees different lists, so everything goes,
        // `/api/user` included.
        self.cache.clear();
        Ok(user)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let _: serde_json::Value = self.send(Method::POST, "/api/logout", None::<&()>).await?;
        self.cache.clear();
        Ok(())
    }

    /// Always hits the server.
    pub async fn current_user(&self) -> Result<User, ClientError> {
        self.fetch(CURRENT_USER, &[]).await
    }

    // -- users ----------------------------------------------------------

    pub async fn list_users(
        &self,
        role: Option<Role>,
        search: Option<&str>,
    ) -> Result<Vec<User>, ClientError> {
        let mut params = Vec::new();
        if let Some(role) = role {
            params.push(("role", role.as_str().to_string()));
        }
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }
        self.fetch(USERS, &params).await
    }

    pub async fn user_stats(&self) -> Result<UserStats, ClientError> {
        self.fetch("/api/users/stats", &[]).await
    }

    pub async fn create_user(&self, input: &CreateUser) -> Result<User, ClientError> {
        let user = self.send(Method::POST, USERS, Some(input)).await?;
        self.cache.invalidate(USERS);
        Ok(user)
    }

    pub async fn update_user(&self, id: Uuid, patch: &UpdateUser) -> Result<User, ClientError> {
        let user = self
            .send(Method::PATCH, &format!("{USERS}/{id}"), Some(patch))
            .await?;
        self.cache.invalidate(USERS);
        Ok(user)
    }

    // -- mail -----------------------------------------------------------

    pub async fn list_emails(&self, folder: Option<Folder>) -> Result<Vec<Message>, ClientError> {
        let params: Vec<(&str, String)> = folder
            .map(|f| vec![("folder", f.as_str().to_string())])
            .unwrap_or_default();
        self.fetch(EMAILS, &params).await
    }

    pub async fn send_email(&self, input: &CreateMessage) -> Result<Message, ClientError> {
        let message = self.send(Method::POST, EMAILS, Some(input)).await?;
        self.cache.invalidate(EMAILS);
        Ok(message)
    }

    pub async fn set_email_status(
        &self,
        id: Uuid,
        status: &MessageStatus,
    ) -> Result<Message, ClientError> {
        let message = self
            .send(Method::PATCH, &format!("{EMAILS}/{id}/status"), Some(status))
            .await?;
        self.cache.invalidate(EMAILS);
        Ok(message)
    }

    pub async fn move_email(&self, id: Uuid, folder: Folder) -> Result<Message, ClientError> {
        let message = self
            .send(
                Method::PATCH,
                &format!("{EMAILS}/{id}/folder"),
                Some(&json!({ "folder": folder })),
            )
            .await?;
        self.cache.invalidate(EMAILS);
        Ok(message)
    }

    // -- domains --------------------------------------------------------

    pub async fn list_domains(&self) -> Result<Vec<Domain>, ClientError> {
        self.fetch(DOMAINS, &[]).await
    }

    pub async fn create_domain(&self, input: &CreateDomain) -> Result<Domain, ClientError> {
        let domain = self.send(Method::POST, DOMAINS, Some(input)).await?;
        self.cache.invalidate(DOMAINS);
        Ok(domain)
    }

    pub async fn set_domain_active(&self, id: Uuid, is_active: bool) -> Result<Domain, ClientError> {
        let domain = self
            .send(
                Method::PATCH,
                &format!("{DOMAINS}/{id}/status"),
                Some(&json!({ "isActive": is_active })),
            )
            .await?;
        self.cache.invalidate(DOMAINS);
        Ok(domain)
    }

    // -- audit / health -------------------------------------------------

    pub async fn audit_logs(&self, query: &AuditLogQuery) -> Result<Vec<AuditLogEntry>, ClientError> {
        let mut params = Vec::new();
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(action) = &query.action {
            params.push(("action", action.clone()));
        }
        if let Some(actor_id) = query.actor_id {
            params.push(("actorId", actor_id.to_string()));
        }
        if let Some(target) = query.target_user_id {
            params.push(("targetUserId", target.to_string()));
        }
        // The log grows with every privileged mutation; always fetch.
        let url = self.url(AUDIT_LOGS, &params)?;
        let response = self.http.get(url).send().await?;
        decode(response).await
    }

    pub async fn health(&self) -> Result<serde_json::Value, ClientError> {
        let url = self.url("/api/health", &[])?;
        decode(self.http.get(url).send().await?).await
    }

    // -- plumbing -------------------------------------------------------

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, ClientError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| ClientError::Url(e.to_string()))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// GET through the cache.
    async fn fetch<T>(&self, path: &str, params: &[(&str, String)]) -> Result<T, ClientError>
    where
        T: DeserializeOwned + Serialize,
    {
        let url = self.url(path, params)?;
        let key = cache_key(&url);

        if let Some(hit) = self.cache.get::<T>(&key) {
            debug!(key, "query cache hit");
            return Ok(hit);
        }

        let value: T = decode(self.http.get(url).send().await?).await?;
        self.cache.insert(&key, &value);
        Ok(value)
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path, &[])?;
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        decode(request.send().await?).await
    }
}

fn cache_key(url: &Url) -> String {
    match url.query() {
        Some(q) => format!("{}?{q}", url.path()),
        None => url.path().to_string(),
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if status.is_success() {
        return Ok(serde_json::from_slice(&bytes)?);
    }

    let (message, errors) = match serde_json::from_slice::<ErrorBody>(&bytes) {
        Ok(body) => (body.message, body.errors),
        Err(_) => (
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
            Vec::new(),
        ),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_includes_encoded_query() {
        let client = ApiClient::new("http://localhost:5000").unwrap();
        let url = client
            .url(USERS, &[("search", "a b".to_string())])
            .unwrap();
        assert_eq!(cache_key(&url), "/api/users?search=a+b");
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ClientError::Url(_))
        ));
    }
}
