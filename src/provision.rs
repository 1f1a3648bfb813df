//! One-click provisioning of a blog's infrastructure: a Supabase project
//! for the database and a Netlify site for hosting.
//!
//! The flow is a strict sequence, but every completed step writes a marker
//! (with the descriptor it produced) into the `provision_step` table.
//! A re-run after a partial failure skips the finished steps and reuses
//! their descriptors instead of creating duplicate remote resources.

use crate::db::ProvisionStep;
use async_sqlite::Pool;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;

/// Bundled blog schema, applied to the fresh project.
pub const SCHEMA_SQL: &str = include_str!("../database-schema.sql");

pub const STEP_CREATE_PROJECT: &str = "create_project";
pub const STEP_WAIT_READY: &str = "wait_ready";
pub const STEP_APPLY_SCHEMA: &str = "apply_schema";
pub const STEP_CREATE_SITE: &str = "create_site";
pub const STEP_DEPLOY_SITE: &str = "deploy_site";
pub const STEP_SET_ENV: &str = "set_env";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_MAX_ATTEMPTS: u32 = 30;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("request failed during {step}: {source}")]
    Http {
        step: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{step} failed with status {status}: {message}")]
    Api {
        step: &'static str,
        status: u16,
        message: String,
    },
    #[error("Project setup timeout")]
    Timeout,
    #[error("site descriptor has no account_slug, cannot set environment variables")]
    MissingAccountSlug,
    #[error("database error: {0}")]
    Db(#[from] async_sqlite::Error),
    #[error("bad step payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub organization_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub site_name: String,
    pub custom_domain: Option<String>,
    pub blog_title: String,
    pub blog_description: String,
}

/// What the database platform reports about a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
}

/// What the hosting platform reports about a site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteDescriptor {
    pub id: String,
    #[serde(default)]
    pub account_slug: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug)]
pub struct ProvisionOutcome {
    pub project: ProjectDescriptor,
    pub site: SiteDescriptor,
}

pub struct ProvisioningClient {
    http: reqwest::Client,
    pool: Pool,
    database_api: String,
    hosting_api: String,
    database_token: String,
    hosting_token: String,
    poll_interval: Duration,
    max_attempts: u32,
}

impl ProvisioningClient {
    pub fn new(
        http: reqwest::Client,
        pool: Pool,
        database_token: String,
        hosting_token: String,
    ) -> Self {
        Self {
            http,
            pool,
            database_api: crate::oauth::SUPABASE_API_BASE.to_string(),
            hosting_api: crate::oauth::NETLIFY_API_BASE.to_string(),
            database_token,
            hosting_token,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn database_api(mut self, base: impl Into<String>) -> Self {
        self.database_api = base.into();
        self
    }

    pub fn hosting_api(mut self, base: impl Into<String>) -> Self {
        self.hosting_api = base.into();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Runs the whole flow: project, readiness poll, schema, site, deploy,
    /// environment variables. Completed steps are skipped on re-run.
    pub async fn run(
        &self,
        project_config: &ProjectConfig,
        site_config: &SiteConfig,
    ) -> Result<ProvisionOutcome, ProvisionError> {
        let mut project = self.create_project(project_config).await?;
        project = self.wait_for_project_ready(&project).await?;
        self.apply_schema(&project).await?;
        let site = self.create_site(site_config).await?;
        self.deploy_site(&site).await?;
        self.set_env_vars(&site, &project, site_config).await?;
        Ok(ProvisionOutcome { project, site })
    }

    async fn completed<T: for<'de> Deserialize<'de>>(
        &self,
        step: &'static str,
    ) -> Result<Option<T>, ProvisionError> {
        match ProvisionStep::get_by_step(&self.pool, step.to_string()).await? {
            Some(marker) => {
                log::info!("provision: {step} already completed, reusing result");
                Ok(Some(serde_json::from_str(&marker.payload)?))
            }
            None => Ok(None),
        }
    }

    async fn record<T: Serialize>(
        &self,
        step: &'static str,
        payload: &T,
    ) -> Result<(), ProvisionError> {
        ProvisionStep::new(step, payload)?
            .save_or_update(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_project(
        &self,
        config: &ProjectConfig,
    ) -> Result<ProjectDescriptor, ProvisionError> {
        if let Some(project) = self.completed(STEP_CREATE_PROJECT).await? {
            return Ok(project);
        }

        log::info!("provision: creating database project '{}'", config.name);
        let response = self
            .http
            .post(format!("{}/v1/projects", self.database_api))
            .bearer_auth(&self.database_token)
            .json(&json!({
                "name": config.name,
                "organization_id": config.organization_id,
                "plan": "free",
                "region": "us-east-1",
                "db_pass": generate_secure_password(),
            }))
            .send()
            .await
            .map_err(|source| ProvisionError::Http { step: STEP_CREATE_PROJECT, source })?;

        let project: ProjectDescriptor =
            decode_or_api_error(STEP_CREATE_PROJECT, response).await?;
        self.record(STEP_CREATE_PROJECT, &project).await?;
        Ok(project)
    }

    async fn wait_for_project_ready(
        &self,
        project: &ProjectDescriptor,
    ) -> Result<ProjectDescriptor, ProvisionError> {
        if let Some(ready) = self.completed(STEP_WAIT_READY).await? {
            return Ok(ready);
        }

        for attempt in 1..=self.max_attempts {
            let response = self
                .http
                .get(format!("{}/v1/projects/{}", self.database_api, project.id))
                .bearer_auth(&self.database_token)
                .send()
                .await
                .map_err(|source| ProvisionError::Http { step: STEP_WAIT_READY, source })?;

            // A failed status poll is not fatal; the next attempt may succeed.
            match response.json::<ProjectDescriptor>().await {
                Ok(current) if current.status == "ACTIVE_HEALTHY" => {
                    self.record(STEP_WAIT_READY, &current).await?;
                    return Ok(current);
                }
                Ok(current) => {
                    log::info!(
                        "provision: project {} status '{}' (attempt {attempt}/{})",
                        project.id,
                        current.status,
                        self.max_attempts
                    );
                }
                Err(err) => log::error!("provision: error checking project status: {err}"),
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Err(ProvisionError::Timeout)
    }

    async fn apply_schema(&self, project: &ProjectDescriptor) -> Result<(), ProvisionError> {
        if self.completed::<Value>(STEP_APPLY_SCHEMA).await?.is_some() {
            return Ok(());
        }

        log::info!("provision: applying blog schema to project {}", project.id);
        let response = self
            .http
            .post(format!(
                "{}/v1/projects/{}/database/query",
                self.database_api, project.id
            ))
            .bearer_auth(&self.database_token)
            .json(&json!({ "query": SCHEMA_SQL }))
            .send()
            .await
            .map_err(|source| ProvisionError::Http { step: STEP_APPLY_SCHEMA, source })?;

        let result: Value = decode_or_api_error(STEP_APPLY_SCHEMA, response).await?;
        self.record(STEP_APPLY_SCHEMA, &result).await?;
        Ok(())
    }

    async fn create_site(&self, config: &SiteConfig) -> Result<SiteDescriptor, ProvisionError> {
        if let Some(site) = self.completed(STEP_CREATE_SITE).await? {
            return Ok(site);
        }

        log::info!("provision: creating hosting site '{}'", config.site_name);
        let response = self
            .http
            .post(format!("{}/api/v1/sites", self.hosting_api))
            .bearer_auth(&self.hosting_token)
            .json(&json!({
                "name": config.site_name,
                "custom_domain": config.custom_domain,
            }))
            .send()
            .await
            .map_err(|source| ProvisionError::Http { step: STEP_CREATE_SITE, source })?;

        let site: SiteDescriptor = decode_or_api_error(STEP_CREATE_SITE, response).await?;
        self.record(STEP_CREATE_SITE, &site).await?;
        Ok(site)
    }

    async fn deploy_site(&self, site: &SiteDescriptor) -> Result<(), ProvisionError> {
        if self.completed::<Value>(STEP_DEPLOY_SITE).await?.is_some() {
            return Ok(());
        }

        log::info!("provision: requesting deploy for site {}", site.id);
        // TODO: upload the built site bundle instead of an empty file set
        // once the template build pipeline exists.
        let response = self
            .http
            .post(format!("{}/api/v1/sites/{}/deploys", self.hosting_api, site.id))
            .bearer_auth(&self.hosting_token)
            .json(&json!({
                "files": {},
                "functions": {},
                "branch": "main",
                "framework": "vite",
            }))
            .send()
            .await
            .map_err(|source| ProvisionError::Http { step: STEP_DEPLOY_SITE, source })?;

        let deploy: Value = decode_or_api_error(STEP_DEPLOY_SITE, response).await?;
        self.record(STEP_DEPLOY_SITE, &deploy).await?;
        Ok(())
    }

    async fn set_env_vars(
        &self,
        site: &SiteDescriptor,
        project: &ProjectDescriptor,
        config: &SiteConfig,
    ) -> Result<(), ProvisionError> {
        if self.completed::<Value>(STEP_SET_ENV).await?.is_some() {
            return Ok(());
        }

        if site.account_slug.is_empty() {
            return Err(ProvisionError::MissingAccountSlug);
        }

        let env_vars = [
            ("VITE_SUPABASE_URL", project.url.as_str()),
            ("VITE_SUPABASE_ANON_KEY", project.anon_key.as_str()),
            ("VITE_BLOG_TITLE", config.blog_title.as_str()),
            ("VITE_BLOG_DESCRIPTION", config.blog_description.as_str()),
        ];
        let body: Vec<Value> = env_vars
            .iter()
            .map(|(key, value)| {
                json!({
                    "key": key,
                    "values": [{ "value": value, "context": "all" }],
                })
            })
            .collect();

        log::info!("provision: pushing environment variables to {}", site.account_slug);
        let response = self
            .http
            .post(format!(
                "{}/api/v1/accounts/{}/env",
                self.hosting_api, site.account_slug
            ))
            .bearer_auth(&self.hosting_token)
            .json(&body)
            .send()
            .await
            .map_err(|source| ProvisionError::Http { step: STEP_SET_ENV, source })?;

        let result: Value = decode_or_api_error(STEP_SET_ENV, response).await?;
        self.record(STEP_SET_ENV, &result).await?;
        Ok(())
    }
}

async fn decode_or_api_error<T: for<'de> Deserialize<'de>>(
    step: &'static str,
    response: reqwest::Response,
) -> Result<T, ProvisionError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ProvisionError::Api {
            step,
            status: status.as_u16(),
            message,
        });
    }
    response
        .json()
        .await
        .map_err(|source| ProvisionError::Http { step, source })
}

/// 16 characters, letters/digits/symbols.
fn generate_secure_password() -> String {
    const CHARS: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";
    let mut rng = rand::thread_rng();
    (0..16)
        .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_tables;
    use async_sqlite::PoolBuilder;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn test_pool() -> (Pool, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = PoolBuilder::new()
            .path(dir.path().join("provision.sqlite3"))
            .open()
            .await
            .unwrap();
        create_tables(&pool).await.unwrap();
        (pool, dir)
    }

    fn client(server: &MockServer, pool: Pool) -> ProvisioningClient {
        ProvisioningClient::new(
            reqwest::Client::new(),
            pool,
            "db-token".to_string(),
            "host-token".to_string(),
        )
        .database_api(server.uri())
        .hosting_api(server.uri())
        .poll_interval(Duration::from_millis(1))
        .max_attempts(3)
    }

    fn project_config() -> ProjectConfig {
        ProjectConfig {
            name: "my-blog".to_string(),
            organization_id: "org-1".to_string(),
        }
    }

    fn site_config() -> SiteConfig {
        SiteConfig {
            site_name: "my-blog".to_string(),
            custom_domain: None,
            blog_title: "My Blog".to_string(),
            blog_description: "A blog".to_string(),
        }
    }

    async fn mount_database_mocks(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v1/projects"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "proj-1", "status": "COMING_UP",
            })))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/projects/proj-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "proj-1",
                "status": "ACTIVE_HEALTHY",
                "url": "https://proj-1.supabase.co",
                "anon_key": "anon-1",
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/proj-1/database/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(server)
            .await;
    }

    async fn mount_hosting_mocks(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/v1/sites"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "site-1", "account_slug": "team-1", "url": "https://my-blog.netlify.app",
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/sites/site-1/deploys"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "deploy-1",
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/accounts/team-1/env"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn full_flow_records_all_step_markers() {
        let server = MockServer::start().await;
        mount_database_mocks(&server).await;
        mount_hosting_mocks(&server).await;
        let (pool, _dir) = test_pool().await;

        let outcome = client(&server, pool.clone())
            .run(&project_config(), &site_config())
            .await
            .unwrap();

        assert_eq!(outcome.project.id, "proj-1");
        assert_eq!(outcome.project.anon_key, "anon-1");
        assert_eq!(outcome.site.id, "site-1");

        for step in [
            STEP_CREATE_PROJECT,
            STEP_WAIT_READY,
            STEP_APPLY_SCHEMA,
            STEP_CREATE_SITE,
            STEP_DEPLOY_SITE,
            STEP_SET_ENV,
        ] {
            let marker = ProvisionStep::get_by_step(&pool, step.to_string())
                .await
                .unwrap();
            assert!(marker.is_some(), "missing marker for {step}");
        }
    }

    #[tokio::test]
    async fn polling_gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "proj-1", "status": "COMING_UP",
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/projects/proj-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "proj-1", "status": "COMING_UP",
            })))
            .expect(3)
            .mount(&server)
            .await;
        let (pool, _dir) = test_pool().await;

        let err = client(&server, pool)
            .run(&project_config(), &site_config())
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Timeout));
    }

    #[tokio::test]
    async fn rerun_after_partial_failure_skips_completed_steps() {
        // First run: database side succeeds, site creation fails.
        let first = MockServer::start().await;
        mount_database_mocks(&first).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/sites"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&first)
            .await;
        let (pool, _dir) = test_pool().await;

        let err = client(&first, pool.clone())
            .run(&project_config(), &site_config())
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Api { step, .. } if step == STEP_CREATE_SITE));

        // Second run against a server that would reject any database call:
        // the completed markers must keep those steps from re-firing.
        let second = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&second)
            .await;
        mount_hosting_mocks(&second).await;

        let outcome = client(&second, pool)
            .run(&project_config(), &site_config())
            .await
            .unwrap();
        assert_eq!(outcome.project.id, "proj-1");
        assert_eq!(outcome.site.id, "site-1");
    }

    #[test]
    fn generated_password_is_sixteen_chars() {
        let password = generate_secure_password();
        assert_eq!(password.len(), 16);
        assert_ne!(password, generate_secure_password());
    }
}
