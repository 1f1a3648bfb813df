//! The guided setup wizard: three linear steps collecting database
//! credentials and blog details, then persisting them as the durable
//! setup configuration.

use crate::config::{ConfigError, ConfigStore, SetupConfig};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Database,
    BlogDetails,
    Complete,
}

impl WizardStep {
    pub fn number(&self) -> u8 {
        match self {
            WizardStep::Database => 1,
            WizardStep::BlogDetails => 2,
            WizardStep::Complete => 3,
        }
    }
}

#[derive(Error, Debug)]
pub enum WizardError {
    #[error("Please enter both Supabase URL and API key")]
    MissingDatabaseFields,
    #[error("Please fill in all required fields")]
    MissingBlogFields,
    #[error("Setup failed. Please check your credentials.")]
    Save(#[from] ConfigError),
}

/// Everything the wizard collects. The admin password is held here only
/// for the duration of the flow; it is never persisted.
#[derive(Debug, Clone)]
pub struct WizardForm {
    pub supabase_url: String,
    pub supabase_key: String,
    pub blog_title: String,
    pub blog_description: String,
    pub admin_email: String,
    pub admin_password: String,
}

impl Default for WizardForm {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_key: String::new(),
            blog_title: "My Awesome Blog".to_string(),
            blog_description: "A beautiful blog powered by ZMime".to_string(),
            admin_email: String::new(),
            admin_password: String::new(),
        }
    }
}

/// The setup phases shown while completing, with their nominal durations.
const SETUP_PHASES: [(&str, Duration); 3] = [
    ("Connecting to Supabase...", Duration::from_millis(2000)),
    ("Setting up database...", Duration::from_millis(2000)),
    ("Creating admin account...", Duration::from_millis(1500)),
];

pub struct SetupWizard {
    step: WizardStep,
    pub form: WizardForm,
    // Scales the phase delays; tests shrink it to zero.
    phase_scale: f32,
}

impl SetupWizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Database,
            form: WizardForm::default(),
            phase_scale: 1.0,
        }
    }

    pub fn with_phase_scale(mut self, scale: f32) -> Self {
        self.phase_scale = scale;
        self
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    fn validate_database(&self) -> Result<(), WizardError> {
        if self.form.supabase_url.trim().is_empty() || self.form.supabase_key.trim().is_empty() {
            return Err(WizardError::MissingDatabaseFields);
        }
        Ok(())
    }

    fn validate_blog_details(&self) -> Result<(), WizardError> {
        if self.form.blog_title.trim().is_empty()
            || self.form.admin_email.trim().is_empty()
            || self.form.admin_password.trim().is_empty()
        {
            return Err(WizardError::MissingBlogFields);
        }
        Ok(())
    }

    /// Moves forward one step, validating the current one first.
    /// Advancing from the blog-details step goes through [`Self::complete`].
    pub fn advance(&mut self) -> Result<WizardStep, WizardError> {
        match self.step {
            WizardStep::Database => {
                self.validate_database()?;
                self.step = WizardStep::BlogDetails;
            }
            WizardStep::BlogDetails | WizardStep::Complete => {}
        }
        Ok(self.step)
    }

    /// Moves back one step; clamps at the first step.
    pub fn back(&mut self) -> WizardStep {
        if self.step == WizardStep::BlogDetails {
            self.step = WizardStep::Database;
        }
        self.step
    }

    /// Validates everything collected so far (database credentials included,
    /// so a direct completion request cannot sidestep the first step),
    /// persists the seven configuration keys and walks the simulated setup
    /// phases before declaring success.
    ///
    /// Real provisioning is deliberately not triggered here: the linked
    /// accounts flow drives [`crate::provision::ProvisioningClient`]
    /// separately.
    pub async fn complete(&mut self, store: &ConfigStore) -> Result<SetupConfig, WizardError> {
        self.validate_database()?;
        self.validate_blog_details()?;

        let config = SetupConfig {
            supabase_url: Some(self.form.supabase_url.clone()),
            supabase_key: Some(self.form.supabase_key.clone()),
            blog_title: Some(self.form.blog_title.clone()),
            blog_description: Some(self.form.blog_description.clone()),
            admin_email: Some(self.form.admin_email.clone()),
            setup_complete: true,
            supabase_configured: true,
        };
        store.save(&config).await?;

        for (message, duration) in SETUP_PHASES {
            log::info!("{message}");
            let scaled = duration.mul_f32(self.phase_scale);
            if !scaled.is_zero() {
                tokio::time::sleep(scaled).await;
            }
        }

        log::info!("Setup completed successfully!");
        self.step = WizardStep::Complete;
        Ok(config)
    }
}

impl Default for SetupWizard {
    fn default() -> Self {
        Self::new()
    }
}
