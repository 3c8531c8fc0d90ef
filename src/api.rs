// API client module: a small blocking HTTP client for the platform's
// developer API (device-code auth, projects, servers, nameservers and the
// SQL proxy). Every call is a single request/response exchange.

use crate::error::{ApiError, ApiResult};
use crate::query::{decode_query_response, QueryRequest, QueryResult};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ID_LEN: usize = 100;

/// Blocking API client holding the reqwest client and the base URL of the
/// API gateway. The access token is passed per call; the client itself is
/// cheap to clone and safe to share across threads.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub interval: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Developer {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub developer: Developer,
}

#[derive(Deserialize, Debug, Clone)]
pub struct UserInfo {
    pub developer: Developer,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub has_api_key: bool,
    #[serde(default)]
    pub database_url: Option<String>,
}

/// A nameserver. The API still calls these "databases".
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Nameserver {
    pub id: String,
    #[serde(rename = "databaseName")]
    pub name: String,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub has_token: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Deserialize, Debug)]
struct ProjectsResponse {
    #[serde(default)]
    projects: Vec<Project>,
}

#[derive(Deserialize, Debug)]
struct ServersResponse {
    #[serde(default)]
    servers: Vec<Server>,
}

#[derive(Deserialize, Debug)]
struct NameserversResponse {
    #[serde(default)]
    databases: Vec<Nameserver>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateNameserverRequest<'a> {
    database_name: &'a str,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CreatedNameserver {
    #[serde(rename = "database")]
    pub nameserver: Nameserver,
    #[serde(default)]
    pub message: String,
}

/// Table set created by the initialize endpoint.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    #[default]
    Messaging,
    Analytics,
    Both,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InitializeRequest {
    schema_type: SchemaType,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    drop_existing: bool,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct InitializeReport {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub schema_type: Option<String>,
    #[serde(default)]
    pub tables_created: u32,
    #[serde(default)]
    pub verified_tables: Vec<String>,
    #[serde(default)]
    pub all_tables: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// IDs travel as path segments; only a conservative alphabet is accepted.
pub fn validate_id(kind: &str, id: &str) -> ApiResult<()> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ApiError::InvalidInput(format!("invalid {} ID: {:?}", kind, id)))
    }
}

impl ApiClient {
    pub fn new(base_url: &str) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("flux-relay-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a URL from percent-encoded path segments.
    fn url(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::InvalidInput(format!("invalid API URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidInput(format!("invalid API URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, req: RequestBuilder, token: &str) -> ApiResult<RequestBuilder> {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::InvalidInput("access token contains invalid characters".into()))?;
        Ok(req.header(AUTHORIZATION, value))
    }

    /// Send a request and return status plus body text.
    fn send(&self, req: RequestBuilder) -> ApiResult<(StatusCode, String)> {
        let res: Response = req.send()?;
        let status = res.status();
        debug!(url = %res.url(), status = status.as_u16(), "api response");
        let body = res.text()?;
        Ok((status, body))
    }

    fn expect_json<T: DeserializeOwned>(status: StatusCode, body: &str) -> ApiResult<T> {
        if !status.is_success() {
            return Err(ApiError::from_body(status.as_u16(), body));
        }
        Ok(serde_json::from_str(body)?)
    }

    fn get_json<T: DeserializeOwned>(&self, token: &str, segments: &[&str]) -> ApiResult<T> {
        let url = self.url(segments)?;
        debug!(%url, "GET");
        let req = self.authorized(self.client.get(url), token)?;
        let (status, body) = self.send(req)?;
        Self::expect_json(status, &body)
    }

    /// Request a new device code for the login flow.
    pub fn initiate_device_code(&self) -> ApiResult<DeviceCodeResponse> {
        let url = self.url(&["api", "cli", "auth", "initiate"])?;
        debug!(%url, "POST");
        let (status, body) = self.send(self.client.post(url))?;
        Self::expect_json(status, &body)
    }

    /// Poll once for the token belonging to `device_code`.
    ///
    /// A `202 Accepted` means the user has not finished in the browser yet
    /// and is reported as `authorization_pending`.
    pub fn get_token(&self, device_code: &str) -> ApiResult<TokenResponse> {
        if device_code.len() != 8 || !device_code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ApiError::InvalidInput("invalid device code format".into()));
        }
        let mut url = self.url(&["api", "cli", "auth", "token"])?;
        url.query_pairs_mut().append_pair("device_code", device_code);
        debug!(%url, "GET");
        let (status, body) = self.send(self.client.get(url))?;

        if status == StatusCode::ACCEPTED {
            return Err(match ApiError::from_body(status.as_u16(), &body) {
                remote @ ApiError::Remote { .. } => remote,
                _ => ApiError::Remote {
                    code: "authorization_pending".into(),
                    description: Some(
                        "The user has not yet completed the authorization flow.".into(),
                    ),
                },
            });
        }
        Self::expect_json(status, &body)
    }

    pub fn current_user(&self, token: &str) -> ApiResult<UserInfo> {
        self.get_json(token, &["api", "developer", "me"])
    }

    pub fn list_projects(&self, token: &str) -> ApiResult<Vec<Project>> {
        let res: ProjectsResponse = self.get_json(token, &["api", "developer", "projects"])?;
        Ok(res.projects)
    }

    pub fn list_servers(&self, token: &str, project_id: &str) -> ApiResult<Vec<Server>> {
        validate_id("project", project_id)?;
        let res: ServersResponse = self.get_json(
            token,
            &["api", "developer", "projects", project_id, "servers"],
        )?;
        Ok(res.servers)
    }

    pub fn list_nameservers(
        &self,
        token: &str,
        project_id: &str,
        server_id: &str,
    ) -> ApiResult<Vec<Nameserver>> {
        validate_id("project", project_id)?;
        validate_id("server", server_id)?;
        let res: NameserversResponse = self.get_json(
            token,
            &[
                "api", "developer", "projects", project_id, "servers", server_id, "databases",
            ],
        )?;
        Ok(res.databases)
    }

    /// Run a SQL statement through the server's database proxy.
    pub fn execute_query(
        &self,
        token: &str,
        project_id: &str,
        server_id: &str,
        query: &str,
    ) -> ApiResult<QueryResult> {
        validate_id("project", project_id)?;
        validate_id("server", server_id)?;
        let url = self.url(&[
            "api", "developer", "projects", project_id, "servers", server_id, "database", "query",
        ])?;
        debug!(%url, "POST query");
        let req = self.authorized(self.client.post(url), token)?.json(&QueryRequest {
            query,
            args: Vec::new(),
        });
        let (status, body) = self.send(req)?;
        if !status.is_success() {
            return Err(ApiError::from_body(status.as_u16(), &body));
        }
        Ok(decode_query_response(&body)?)
    }

    pub fn create_nameserver(
        &self,
        token: &str,
        project_id: &str,
        server_id: &str,
        name: &str,
    ) -> ApiResult<CreatedNameserver> {
        validate_id("project", project_id)?;
        validate_id("server", server_id)?;
        if name.is_empty() || name.chars().count() > MAX_ID_LEN {
            return Err(ApiError::InvalidInput(
                "invalid nameserver name: must be 1-100 characters".into(),
            ));
        }
        let url = self.url(&[
            "api", "developer", "projects", project_id, "servers", server_id, "databases",
        ])?;
        debug!(%url, nameserver = name, "POST create nameserver");
        let req = self
            .authorized(self.client.post(url), token)?
            .json(&CreateNameserverRequest { database_name: name });
        let (status, body) = self.send(req)?;
        Self::expect_json(status, &body)
    }

    pub fn initialize_nameserver(
        &self,
        token: &str,
        project_id: &str,
        server_id: &str,
        nameserver_id: &str,
        schema_type: SchemaType,
        drop_existing: bool,
    ) -> ApiResult<InitializeReport> {
        validate_id("project", project_id)?;
        validate_id("server", server_id)?;
        validate_id("nameserver", nameserver_id)?;
        let url = self.url(&[
            "api",
            "developer",
            "projects",
            project_id,
            "servers",
            server_id,
            "databases",
            nameserver_id,
            "initialize",
        ])?;
        debug!(%url, ?schema_type, drop_existing, "POST initialize nameserver");
        let req = self
            .authorized(self.client.post(url), token)?
            .json(&InitializeRequest {
                schema_type,
                drop_existing,
            });
        let (status, body) = self.send(req)?;
        Self::expect_json(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("project", "56OSXXQH").is_ok());
        assert!(validate_id("server", "server_123-a").is_ok());
        assert!(validate_id("server", "").is_err());
        assert!(validate_id("server", "../etc").is_err());
        assert!(validate_id("server", &"a".repeat(101)).is_err());
    }

    #[test]
    fn test_url_segments_are_encoded() {
        let client = ApiClient::new("https://api.example.com/").unwrap();
        let url = client.url(&["api", "developer", "projects", "a b"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/api/developer/projects/a%20b"
        );
    }

    #[test]
    fn test_get_token_rejects_bad_code_locally() {
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        let err = client.get_token("short").unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_nameserver_decodes_database_name() {
        let ns: Nameserver = serde_json::from_str(
            r#"{"id":"db_1","databaseName":"name1","hasToken":true,"createdAt":"2024-01-02T03:04:05Z","isActive":true}"#,
        )
        .unwrap();
        assert_eq!(ns.name, "name1");
        assert!(ns.is_active);
    }

    #[test]
    fn test_initialize_request_shape() {
        let body = serde_json::to_string(&InitializeRequest {
            schema_type: SchemaType::Both,
            drop_existing: false,
        })
        .unwrap();
        assert_eq!(body, r#"{"schemaType":"both"}"#);
    }
}
