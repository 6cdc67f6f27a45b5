//! HTTP client for the platform directory API.
//!
//! Every call carries the bearer token and a JSON content type. There is no
//! retry in here: a failed call surfaces as an error tagged with its
//! operation, and the caller decides whether to run again.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use crate::api::Directory;
use crate::config::DirectoryConfig;
use crate::dashboard;
use crate::error::{Error, Result};
use crate::models::{
    CreateTeamRequest, CreateUserRequest, DataEnvelope, Membership, NewTeam, RemoteTeam,
    RemoteUser, SaveMembershipRequest, TeamId, TeamRole, UserId,
};

/// Client for the remote directory.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    /// Configuration for the client.
    config: Arc<DirectoryConfig>,
    /// API base, without trailing slash.
    api_base: String,
    /// Dashboard API base, without trailing slash.
    dashboard_base: String,
    /// Underlying HTTP client.
    http_client: reqwest::Client,
}

/// Response of `POST /platform/v1/users`; the email may be omitted.
#[derive(Debug, serde::Deserialize)]
struct CreatedUser {
    id: UserId,
    #[serde(default)]
    email: Option<String>,
}

impl DirectoryClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Fails when an endpoint is not a valid URL or the HTTP client cannot be
    /// built. Missing credentials are not an error here.
    pub fn new(config: DirectoryConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("teamsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Self::with_http_client(config, http_client)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Fails when a configured endpoint is not a valid URL.
    pub fn with_http_client(config: DirectoryConfig, http_client: reqwest::Client) -> Result<Self> {
        let api_base = normalize_base(&config.credentials.api_endpoint)?;
        let dashboard_base = normalize_base(config.resolved_dashboard_endpoint())?;

        Ok(Self {
            config: Arc::new(config),
            api_base,
            dashboard_base,
            http_client,
        })
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .bearer_auth(&self.config.credentials.token)
            .header(CONTENT_TYPE, "application/json")
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    async fn send(&self, operation: &str, builder: RequestBuilder) -> Result<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::transport(operation, e))?;

        let status = response.status();
        if status.is_success() {
            debug!(operation, status = status.as_u16(), "Directory call succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::status(operation, status.as_u16(), body))
    }

    async fn read_json<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(operation, e))?;
        serde_json::from_str(&body).map_err(|e| Error::invalid_response(operation, e.to_string()))
    }

    async fn read_list<T: DeserializeOwned>(operation: &str, response: Response) -> Result<Vec<T>> {
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(operation, e))?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str::<DataEnvelope<T>>(&body)
            .map(|envelope| envelope.data)
            .map_err(|e| Error::invalid_response(operation, e.to_string()))
    }
}

#[async_trait]
impl Directory for DirectoryClient {
    async fn find_teams_by_name(&self, name: &str) -> Result<Vec<RemoteTeam>> {
        const OP: &str = "find_teams_by_name";
        let builder = self
            .request(Method::GET, &self.api_url("/platform/v1/teams"))
            .query(&[("filter", format!("name:{name}"))]);
        let response = self.send(OP, builder).await?;
        Self::read_list(OP, response).await
    }

    async fn create_team(&self, team: &NewTeam) -> Result<RemoteTeam> {
        const OP: &str = "create_team";
        let builder = self
            .request(Method::POST, &self.api_url("/platform/v1/teams"))
            .json(&CreateTeamRequest::from(team));
        let response = self.send(OP, builder).await?;
        let created: RemoteTeam = Self::read_json(OP, response).await?;
        info!(id = %created.id, name = %created.name, product = %team.product, "Created team");
        Ok(created)
    }

    async fn delete_team(&self, team_id: TeamId) -> Result<()> {
        let url = self.api_url(&format!("/platform/v1/teams/{team_id}"));
        self.send("delete_team", self.request(Method::DELETE, &url))
            .await
            .map(drop)
    }

    async fn find_users_by_email(&self, email: &str) -> Result<Vec<RemoteUser>> {
        const OP: &str = "find_users_by_email";
        let builder = self
            .request(Method::GET, &self.api_url("/platform/v1/users"))
            .query(&[("filter", format!("email:{email}"))]);
        let response = self.send(OP, builder).await?;
        Self::read_list(OP, response).await
    }

    async fn create_user(&self, email: &str, role: TeamRole) -> Result<RemoteUser> {
        const OP: &str = "create_user";
        let builder = self
            .request(Method::POST, &self.api_url("/platform/v1/users"))
            .json(&CreateUserRequest { email, role });
        let response = self.send(OP, builder).await?;
        let created: CreatedUser = Self::read_json(OP, response).await?;
        Ok(RemoteUser {
            id: created.id,
            email: created.email.unwrap_or_else(|| email.to_string()),
        })
    }

    async fn fetch_memberships(&self, team_id: TeamId) -> Result<Vec<Membership>> {
        const OP: &str = "fetch_memberships";
        let url = self.api_url(&format!("/platform/v1/teams/{team_id}/users"));
        let response = self.send(OP, self.request(Method::GET, &url)).await?;
        Self::read_list(OP, response).await
    }

    async fn grant_membership(
        &self,
        team_id: TeamId,
        user_id: UserId,
        role: TeamRole,
    ) -> Result<()> {
        let url = self.api_url(&format!("/platform/v1/teams/{team_id}/users/{user_id}"));
        let builder = self
            .request(Method::PUT, &url)
            .json(&SaveMembershipRequest { role });
        self.send("grant_membership", builder).await.map(drop)
    }

    async fn revoke_membership(&self, team_id: TeamId, user_id: UserId) -> Result<()> {
        let url = self.api_url(&format!("/platform/v1/teams/{team_id}/users/{user_id}"));
        self.send("revoke_membership", self.request(Method::DELETE, &url))
            .await
            .map(drop)
    }

    async fn provision_dashboard(&self, team_id: TeamId, namespace: &str) -> Result<()> {
        let payload = dashboard::render(team_id, namespace)?;
        let url = format!("{}{}", self.dashboard_base, dashboard::DASHBOARDS_PATH);
        let builder = self.request(Method::POST, &url).json(&payload);
        self.send("provision_dashboard", builder).await?;
        info!(%team_id, namespace, "Provisioned dashboard");
        Ok(())
    }
}

/// Validate an endpoint and strip its trailing slash. Empty stays empty.
fn normalize_base(endpoint: &str) -> Result<String> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    Url::parse(trimmed)?;
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::models::{MemberRole, Product};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn client_for(server: &MockServer) -> Result<DirectoryClient> {
        DirectoryClient::new(DirectoryConfig::new(Credentials::new(
            server.uri(),
            "test-token",
        )))
    }

    #[test]
    fn test_normalize_base() {
        assert_eq!(
            normalize_base("https://api.example.com/").ok(),
            Some("https://api.example.com".to_string())
        );
        assert_eq!(normalize_base("").ok(), Some(String::new()));
        assert!(normalize_base("not a url").is_err());
    }

    #[tokio::test]
    async fn test_find_teams_sends_filter_and_token() -> TestResult {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/platform/v1/teams"))
            .and(query_param("filter", "name:proj-team"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "page": {"total": 2},
                "data": [
                    {"id": 1, "name": "proj-team", "version": 3},
                    {"id": 2, "name": "proj-team-secure"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let teams = client_for(&server)?.find_teams_by_name("proj-team").await?;

        assert_eq!(teams.len(), 2);
        assert_eq!(teams.first().map(|t| t.id), Some(TeamId(1)));
        Ok(())
    }

    #[tokio::test]
    async fn test_find_teams_empty_body_is_empty_list() -> TestResult {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/platform/v1/teams"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let teams = client_for(&server)?.find_teams_by_name("proj-team").await?;
        assert!(teams.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_non_success_status_is_tagged_with_operation() -> TestResult {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/platform/v1/users"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let result = client_for(&server)?.find_users_by_email("a@x.com").await;

        match result {
            Err(Error::Status {
                operation,
                status,
                body,
            }) => {
                assert_eq!(operation, "find_users_by_email");
                assert_eq!(status, 401);
                assert_eq!(body, "bad token");
            }
            other => return Err(format!("unexpected result: {other:?}").into()),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_create_team_posts_payload() -> TestResult {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/platform/v1/teams"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"id": 10, "name": "proj-team"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let team = NewTeam::new(
            "proj-team",
            "Project",
            Product::Monitor,
            vec!["proj-tools".to_string()],
        );
        let created = client_for(&server)?.create_team(&team).await?;
        assert_eq!(created.id, TeamId(10));

        let requests = server.received_requests().await.unwrap_or_default();
        let body: serde_json::Value = requests
            .first()
            .map(|r| serde_json::from_slice(&r.body))
            .transpose()?
            .unwrap_or_default();
        assert_eq!(body["product"], "monitor");
        assert_eq!(
            body["scopes"][1]["expression"],
            r#"kubernetes.namespace.name in ("proj-tools")"#
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_create_user_falls_back_to_requested_email() -> TestResult {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/platform/v1/users"))
            .and(body_json(serde_json::json!({"email": "a@x.com", "role": "ROLE_TEAM_EDIT"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 5})))
            .mount(&server)
            .await;

        let user = client_for(&server)?
            .create_user("a@x.com", TeamRole::Edit)
            .await?;
        assert_eq!(user.id, UserId(5));
        assert_eq!(user.email, "a@x.com");
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_memberships() -> TestResult {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/platform/v1/teams/7/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"userId": 1, "standardTeamRole": "ROLE_TEAM_EDIT"},
                    {"userId": 2, "standardTeamRole": "ROLE_TEAM_MANAGER"}
                ]
            })))
            .mount(&server)
            .await;

        let memberships = client_for(&server)?.fetch_memberships(TeamId(7)).await?;
        assert_eq!(
            memberships,
            vec![
                Membership {
                    user_id: UserId(1),
                    role: MemberRole::Standard(TeamRole::Edit)
                },
                Membership {
                    user_id: UserId(2),
                    role: MemberRole::Standard(TeamRole::Manager)
                },
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_memberships_keeps_custom_role_members() -> TestResult {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/platform/v1/teams/5/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"userId": 1, "standardTeamRole": "ROLE_TEAM_EDIT"},
                    {"userId": 2, "standardTeamRole": null, "customTeamRoleId": 77},
                    {"userId": 3, "standardTeamRole": "ROLE_TEAM_OWNER"}
                ]
            })))
            .mount(&server)
            .await;

        let memberships = client_for(&server)?.fetch_memberships(TeamId(5)).await?;
        let roles: Vec<_> = memberships.iter().map(|m| (m.user_id, m.role)).collect();
        assert_eq!(
            roles,
            vec![
                (UserId(1), MemberRole::Standard(TeamRole::Edit)),
                (UserId(2), MemberRole::Custom),
                (UserId(3), MemberRole::Custom),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_grant_and_revoke_membership() -> TestResult {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/platform/v1/teams/7/users/3"))
            .and(body_json(serde_json::json!({"standardTeamRole": "ROLE_TEAM_READ"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/platform/v1/teams/7/users/3"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server)?;
        client
            .grant_membership(TeamId(7), UserId(3), TeamRole::Read)
            .await?;
        client.revoke_membership(TeamId(7), UserId(3)).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_team() -> TestResult {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/platform/v1/teams/9"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)?.delete_team(TeamId(9)).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_provision_dashboard_uses_dashboard_endpoint() -> TestResult {
        let api = MockServer::start().await;
        let dashboards = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v3/dashboards"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&dashboards)
            .await;

        let config = DirectoryConfig::new(Credentials::new(api.uri(), "test-token"))
            .dashboard_endpoint(dashboards.uri());
        let client = DirectoryClient::new(config)?;

        client.provision_dashboard(TeamId(4), "proj-tools").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_transport_error_is_retryable() -> TestResult {
        let config = DirectoryConfig::new(Credentials::new("http://127.0.0.1:1", "t"))
            .timeout(std::time::Duration::from_millis(200));
        let client = DirectoryClient::new(config)?;

        let result = client.find_teams_by_name("proj-team").await;
        assert!(result.as_ref().is_err_and(Error::is_retryable));
        Ok(())
    }
}
