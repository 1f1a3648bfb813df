/// ZMime: a self-hostable blogging CMS.
///
/// This crate provides the blog data context, the guided setup wizard,
/// OAuth token-exchange proxies and the infrastructure provisioning client
/// that together replace the hosted setup flow.

pub mod blog_info;
pub mod config;
pub mod db;
pub mod handlers;
pub mod oauth;
pub mod provision;
pub mod store;
pub mod templates;
pub mod version;
pub mod wizard;

// Re-export commonly used types for convenience
pub use blog_info::BlogInfo;
pub use config::{ConfigStore, SetupConfig};
pub use db::{create_tables, Post, PostStatus};
pub use handlers::{router, AppState};
pub use oauth::OAuthProvider;
pub use provision::{ProvisionOutcome, ProvisioningClient};
pub use store::{BlogStore, PostUpdate, StoreError};
pub use wizard::{SetupWizard, WizardStep};

// Re-export key external types that applications will need
pub use async_sqlite::{Pool, PoolBuilder};
pub use env_logger;
