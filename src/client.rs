//! HTTP client for the `/api/mbl` endpoints
//!
//! Every response is a JSON envelope with a `success` flag. A `false` flag
//! becomes [`DashboardError::Rejected`] carrying the server's message; anything
//! that prevents reading the envelope is a transport failure.

use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::dashboard::DashboardError;
use crate::middleware::USER_HEADER;
use crate::model::{
    AdminStats, Canje, CanjeRequest, ChartData, Cliente, ClienteRequest, Kpis, Trends,
};

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    username: Option<String>,
}

impl ApiClient {
    /// Client for the server at `base_url`, e.g. `http://localhost:8080`
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            username: None,
        }
    }

    /// Sends `token` as bearer authorization and `username` as the issuing user
    pub fn with_credentials(mut self, token: Option<&str>, username: Option<&str>) -> Self {
        self.token = token.map(str::to_string);
        self.username = username.map(str::to_string);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, format!("{}/api/mbl{}", self.base_url, path));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(username) = &self.username {
            builder = builder.header(USER_HEADER, username);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value, DashboardError> {
        let response = builder.send().await?;
        let status = response.status();
        let body: Value = response.json().await?;

        if body.get("success").and_then(Value::as_bool) == Some(true) {
            Ok(body)
        } else {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("La solicitud falló ({})", status));
            Err(DashboardError::Rejected(message))
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<T, DashboardError> {
        let body = self.send(self.request(Method::GET, path)).await?;
        field(body, key)
    }

    async fn mutate(
        &self,
        method: Method,
        path: &str,
        payload: Option<&impl Serialize>,
    ) -> Result<String, DashboardError> {
        let mut builder = self.request(method, path);
        if let Some(payload) = payload {
            builder = builder.json(payload);
        }
        let body = self.send(builder).await?;
        Ok(body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Operación exitosa")
            .to_string())
    }

    pub async fn list_clientes(&self) -> Result<Vec<Cliente>, DashboardError> {
        self.get("/clientes", "clientes").await
    }

    pub async fn create_cliente(&self, request: &ClienteRequest) -> Result<String, DashboardError> {
        self.mutate(Method::POST, "/clientes", Some(request)).await
    }

    pub async fn update_cliente(
        &self,
        id: u64,
        request: &ClienteRequest,
    ) -> Result<String, DashboardError> {
        self.mutate(Method::PUT, &format!("/clientes/{}", id), Some(request))
            .await
    }

    pub async fn delete_cliente(&self, id: u64) -> Result<String, DashboardError> {
        self.mutate(Method::DELETE, &format!("/clientes/{}", id), None::<&()>)
            .await
    }

    pub async fn list_canjes(&self) -> Result<Vec<Canje>, DashboardError> {
        self.get("/canjes", "canjes").await
    }

    pub async fn create_canje(&self, request: &CanjeRequest) -> Result<String, DashboardError> {
        self.mutate(Method::POST, "/canjes", Some(request)).await
    }

    pub async fn delete_canje(&self, id: u64) -> Result<String, DashboardError> {
        self.mutate(Method::DELETE, &format!("/canjes/{}", id), None::<&()>)
            .await
    }

    pub async fn kpis(&self) -> Result<Kpis, DashboardError> {
        self.get("/analytics/kpis", "kpis").await
    }

    pub async fn daily_sales(&self, days: u32) -> Result<ChartData, DashboardError> {
        self.get(&format!("/analytics/daily-sales?days={}", days), "data")
            .await
    }

    pub async fn top_clients(&self, limit: usize) -> Result<ChartData, DashboardError> {
        self.get(&format!("/analytics/top-clients?limit={}", limit), "data")
            .await
    }

    pub async fn trends(&self) -> Result<Trends, DashboardError> {
        self.get("/analytics/trends", "trends").await
    }

    pub async fn admin_stats(&self) -> Result<AdminStats, DashboardError> {
        self.get("/admin/stats", "stats").await
    }

    pub async fn logout(&self) -> Result<String, DashboardError> {
        self.mutate(Method::POST, "/logout", None::<&()>).await
    }
}

fn field<T: DeserializeOwned>(mut body: Value, key: &str) -> Result<T, DashboardError> {
    let value = body
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| DashboardError::Unexpected(format!("missing `{}` in response", key)))?;
    Ok(serde_json::from_value(value)?)
}
