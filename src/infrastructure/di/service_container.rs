//! Service container for dependency injection
//!
//! Wires settings and I/O boundaries into a ready-to-use session.

use std::sync::Arc;

use crate::application::services::Session;
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::IdentityTreeModel;
use crate::infrastructure::traits::{FileSystem, Prompt, RealFileSystem, StdinPrompt};

/// Container holding settings and the I/O boundaries.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Text-input prompt abstraction
    pub prompt: Arc<dyn Prompt>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem), Arc::new(StdinPrompt))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>, prompt: Arc<dyn Prompt>) -> Self {
        let settings = Arc::new(settings);

        Self { settings, fs, prompt }
    }

    /// Session loaded from the configured data file.
    pub fn open_session(&self) -> ApplicationResult<Session> {
        let model = IdentityTreeModel::new().with_max_age(self.settings.max_age);
        let mut session = Session::with_model(model, self.fs.clone(), self.prompt.clone())
            .with_scope(self.settings.highlight);
        session.load(&self.settings.data_file)?;
        Ok(session)
    }

    /// Persist `session` to the configured data file.
    pub fn save_session(&self, session: &Session) -> ApplicationResult<()> {
        session.save(&self.settings.data_file)
    }
}
