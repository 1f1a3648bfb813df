//! Durable setup configuration.
//!
//! The wizard persists what it collects into the `settings` key-value table,
//! and everything else in the app reads it back through [`ConfigStore`].
//! The lifecycle is deliberate: load once at startup, explicit save,
//! explicit clear.

use async_sqlite::Pool;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage keys. These match the key names the hosted frontend used, so a
/// backup bundle from an existing blog restores cleanly.
pub mod keys {
    pub const SUPABASE_URL: &str = "zmime_supabase_url";
    pub const SUPABASE_KEY: &str = "zmime_supabase_key";
    pub const BLOG_TITLE: &str = "zmime_blog_title";
    pub const BLOG_DESCRIPTION: &str = "zmime_blog_description";
    pub const ADMIN_EMAIL: &str = "zmime_admin_email";
    pub const SETUP_COMPLETE: &str = "zmime_setup_complete";
    pub const SUPABASE_CONFIGURED: &str = "zmime_supabase_configured";
    pub const USER_DATA_BACKUP: &str = "zmime_user_data_backup";
}

pub const DEFAULT_BLOG_TITLE: &str = "My Blog";
pub const DEFAULT_BLOG_DESCRIPTION: &str = "A beautiful blog powered by ZMime";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("database error: {0}")]
    Db(#[from] async_sqlite::Error),
    #[error("invalid backup bundle: {0}")]
    Bundle(#[from] serde_json::Error),
    #[error("no backup bundle found")]
    NoBackup,
}

/// Typed view of the persisted setup configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetupConfig {
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub blog_title: Option<String>,
    pub blog_description: Option<String>,
    pub admin_email: Option<String>,
    pub setup_complete: bool,
    pub supabase_configured: bool,
}

impl SetupConfig {
    pub fn blog_title(&self) -> &str {
        self.blog_title.as_deref().unwrap_or(DEFAULT_BLOG_TITLE)
    }

    pub fn blog_description(&self) -> &str {
        self.blog_description
            .as_deref()
            .unwrap_or(DEFAULT_BLOG_DESCRIPTION)
    }

    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete && self.supabase_configured
    }
}

/// Key-value store over the `settings` table.
#[derive(Clone)]
pub struct ConfigStore {
    pool: Pool,
}

impl ConfigStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &'static str) -> Result<Option<String>, ConfigError> {
        let value = self
            .pool
            .conn(move |conn| {
                let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
                stmt.query_row([key], |row| row.get::<_, String>(0))
                    .map(Some)
                    .or_else(|err| {
                        if err == async_sqlite::rusqlite::Error::QueryReturnedNoRows {
                            Ok(None)
                        } else {
                            Err(err)
                        }
                    })
            })
            .await?;
        Ok(value)
    }

    pub async fn set(&self, key: &'static str, value: String) -> Result<(), ConfigError> {
        self.pool
            .conn(move |conn| {
                conn.execute(
                    "INSERT INTO settings (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = ?2",
                    [key, value.as_str()],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn remove(&self, key: &'static str) -> Result<(), ConfigError> {
        self.pool
            .conn(move |conn| {
                conn.execute("DELETE FROM settings WHERE key = ?1", [key])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Reads the whole configuration in one pass. Done once at startup.
    pub async fn load(&self) -> Result<SetupConfig, ConfigError> {
        Ok(SetupConfig {
            supabase_url: self.get(keys::SUPABASE_URL).await?,
            supabase_key: self.get(keys::SUPABASE_KEY).await?,
            blog_title: self.get(keys::BLOG_TITLE).await?,
            blog_description: self.get(keys::BLOG_DESCRIPTION).await?,
            admin_email: self.get(keys::ADMIN_EMAIL).await?,
            setup_complete: self.get(keys::SETUP_COMPLETE).await?.as_deref() == Some("true"),
            supabase_configured: self.get(keys::SUPABASE_CONFIGURED).await?.as_deref()
                == Some("true"),
        })
    }

    /// Writes the seven configuration keys. Values that are `None` are
    /// stored as empty strings so the key set stays stable.
    pub async fn save(&self, config: &SetupConfig) -> Result<(), ConfigError> {
        self.set(
            keys::SUPABASE_URL,
            config.supabase_url.clone().unwrap_or_default(),
        )
        .await?;
        self.set(
            keys::SUPABASE_KEY,
            config.supabase_key.clone().unwrap_or_default(),
        )
        .await?;
        self.set(
            keys::BLOG_TITLE,
            config.blog_title.clone().unwrap_or_default(),
        )
        .await?;
        self.set(
            keys::BLOG_DESCRIPTION,
            config.blog_description.clone().unwrap_or_default(),
        )
        .await?;
        self.set(
            keys::ADMIN_EMAIL,
            config.admin_email.clone().unwrap_or_default(),
        )
        .await?;
        self.set(keys::SETUP_COMPLETE, config.setup_complete.to_string())
            .await?;
        self.set(
            keys::SUPABASE_CONFIGURED,
            config.supabase_configured.to_string(),
        )
        .await?;
        Ok(())
    }

    /// Removes every `zmime_*` key, backup bundle included.
    pub async fn clear(&self) -> Result<(), ConfigError> {
        self.pool
            .conn(move |conn| {
                conn.execute("DELETE FROM settings WHERE key LIKE 'zmime_%'", [])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Snapshots the current configuration into the backup key and returns
    /// it. Used before updates so user data survives a reinstall.
    pub async fn backup(&self) -> Result<SetupConfig, ConfigError> {
        let config = self.load().await?;
        let bundle = serde_json::to_string(&config)?;
        self.set(keys::USER_DATA_BACKUP, bundle).await?;
        Ok(config)
    }

    /// Restores the configuration from the backup bundle, if one exists.
    pub async fn restore(&self) -> Result<SetupConfig, ConfigError> {
        let bundle = self
            .get(keys::USER_DATA_BACKUP)
            .await?
            .ok_or(ConfigError::NoBackup)?;
        let config: SetupConfig = serde_json::from_str(&bundle)?;
        self.save(&config).await?;
        Ok(config)
    }
}
