//! PostgREST (Supabase) implementation of [`DataStore`].
//!
//! Tables live under `<base>/rest/v1/<table>`; filters and ordering are sent
//! as query parameters. Writes ask for `Prefer: return=representation` so the
//! affected rows come back in the response body.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use super::{DataStore, Query, Row, StoreError, USERS};

/// User identity resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    email: String,
}

#[derive(Debug, Deserialize)]
struct UserRow {
    id: Uuid,
}

/// REST client for the remote store.
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    rest_url: Url,
    auth_url: Url,
    api_key: String,
}

impl RestClient {
    /// Build a client for the store at `base_url`.
    ///
    /// # Errors
    ///
    /// - `InvalidUrl` if `base_url` cannot be parsed
    /// - `Request` if the HTTP client cannot be constructed
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        // Url::join drops the last path segment unless it ends with '/'
        let mut base = Url::parse(base_url.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            rest_url: base.join("rest/v1/")?,
            auth_url: base.join("auth/v1/")?,
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> Result<Url, StoreError> {
        Ok(self.rest_url.join(table)?)
    }

    /// Attach the store credentials to a request.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Resolve a caller's bearer token to a user of this application.
    ///
    /// The token is verified by the store's auth endpoint; the resulting
    /// email is then looked up in the `users` table. Returns `Ok(None)` when
    /// the token is rejected or no matching user row exists.
    pub async fn authenticated_user(
        &self,
        token: &str,
    ) -> Result<Option<AuthenticatedUser>, StoreError> {
        let response = self
            .client
            .get(self.auth_url.join("user")?)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Ok(None);
        }
        let auth_user: AuthUser = check(response).await?.json().await?;

        let rows = self
            .select(USERS, &Query::new().eq("email", &auth_user.email))
            .await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        let user: UserRow = serde_json::from_value(row)?;

        Ok(Some(AuthenticatedUser {
            id: user.id,
            email: auth_user.email,
        }))
    }

    /// Lightweight reachability probe used by the health endpoint.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let request = self.client.get(self.rest_url.clone());
        check(self.authorize(request).send().await?).await?;
        Ok(())
    }
}

/// Turn a non-success response into `StoreError::Status`.
async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

/// PostgREST answers writes with an array of rows.
async fn rows(response: Response) -> Result<Vec<Row>, StoreError> {
    let body: Value = check(response).await?.json().await?;
    match body {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        row => Ok(vec![row]),
    }
}

impl DataStore for RestClient {
    async fn select(&self, table: &'static str, query: &Query) -> Result<Vec<Row>, StoreError> {
        let request = self
            .client
            .get(self.table_url(table)?)
            .query(&[("select", "*")])
            .query(&query.to_params());

        rows(self.authorize(request).send().await?).await
    }

    async fn insert(&self, table: &'static str, row: Row) -> Result<Row, StoreError> {
        let request = self
            .client
            .post(self.table_url(table)?)
            .header("Prefer", "return=representation")
            .json(&row);

        rows(self.authorize(request).send().await?)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::EmptyResponse { table })
    }

    async fn update(
        &self,
        table: &'static str,
        query: &Query,
        patch: Row,
    ) -> Result<Vec<Row>, StoreError> {
        let request = self
            .client
            .patch(self.table_url(table)?)
            .query(&query.to_params())
            .header("Prefer", "return=representation")
            .json(&patch);

        rows(self.authorize(request).send().await?).await
    }

    async fn delete(&self, table: &'static str, query: &Query) -> Result<Vec<Row>, StoreError> {
        let request = self
            .client
            .delete(self.table_url(table)?)
            .query(&query.to_params())
            .header("Prefer", "return=representation");

        rows(self.authorize(request).send().await?).await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    use axum::{
        Json, Router,
        extract::{Query as QueryParams, State},
        http::{HeaderMap, StatusCode},
        routing::get,
    };
    use serde_json::json;

    use super::*;
    use crate::store::Order;

    #[derive(Clone, Default)]
    struct Recorded {
        params: Arc<Mutex<Vec<HashMap<String, String>>>>,
        headers: Arc<Mutex<Vec<HeaderMap>>>,
    }

    async fn list_accounts(
        State(recorded): State<Recorded>,
        headers: HeaderMap,
        QueryParams(params): QueryParams<HashMap<String, String>>,
    ) -> Json<Value> {
        recorded.params.lock().unwrap().push(params);
        recorded.headers.lock().unwrap().push(headers);
        Json(json!([{ "id": "a1", "balance": 10.5 }]))
    }

    async fn insert_account(Json(row): Json<Value>) -> (StatusCode, Json<Value>) {
        let mut stored = row.clone();
        stored["id"] = json!("generated");
        (StatusCode::CREATED, Json(json!([stored])))
    }

    async fn broken() -> (StatusCode, &'static str) {
        (StatusCode::SERVICE_UNAVAILABLE, "maintenance")
    }

    async fn spawn_store(recorded: Recorded) -> String {
        let app = Router::new()
            .route("/rest/v1/accounts", get(list_accounts).post(insert_account))
            .route("/rest/v1/transactions", get(broken))
            .with_state(recorded);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}")
    }

    fn client(base: &str) -> RestClient {
        RestClient::new(base, "secret-key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn select_sends_filters_ordering_and_credentials() {
        let recorded = Recorded::default();
        let base = spawn_store(recorded.clone()).await;

        let query = Query::new()
            .eq("id", "a1")
            .order_by("created_at", Order::Ascending);
        let rows = client(&base).select("accounts", &query).await.unwrap();

        assert_eq!(rows, vec![json!({ "id": "a1", "balance": 10.5 })]);

        let params = recorded.params.lock().unwrap()[0].clone();
        assert_eq!(params.get("id").map(String::as_str), Some("eq.a1"));
        assert_eq!(params.get("order").map(String::as_str), Some("created_at.asc"));
        assert_eq!(params.get("select").map(String::as_str), Some("*"));

        let headers = recorded.headers.lock().unwrap()[0].clone();
        assert_eq!(headers.get("apikey").unwrap(), "secret-key");
        assert_eq!(headers.get("authorization").unwrap(), "Bearer secret-key");
    }

    #[tokio::test]
    async fn insert_returns_the_stored_row() {
        let base = spawn_store(Recorded::default()).await;

        let row = client(&base)
            .insert("accounts", json!({ "name": "Wallet" }))
            .await
            .unwrap();

        assert_eq!(row, json!({ "name": "Wallet", "id": "generated" }));
    }

    #[tokio::test]
    async fn non_success_status_becomes_store_error() {
        let base = spawn_store(Recorded::default()).await;

        let error = client(&base)
            .select("transactions", &Query::new())
            .await
            .unwrap_err();

        match error {
            StoreError::Status { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn base_url_with_path_keeps_its_prefix() {
        let client = client("https://example.test/proxy");
        assert_eq!(
            client.table_url("accounts").unwrap().as_str(),
            "https://example.test/proxy/rest/v1/accounts"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = RestClient::new("not a url", "key", Duration::from_secs(1));
        assert!(matches!(result, Err(StoreError::InvalidUrl(_))));
    }
}
