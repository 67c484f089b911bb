//! Lookup flow and user feedback.
//!
//! A [`Session`] ties a statistics provider, the [`Stage`] and the
//! [`ExportEngine`] together the way the web page does: a username is
//! submitted, the result replaces the current certificate, and every outcome
//! the user should hear about goes through the [`Notifier`] exactly once.

use std::sync::Arc;

use crate::error::ExportError;
use crate::export::{ArtifactFormat, ExportEngine, SavedArtifact};
use crate::lookup::StatsProvider;
use crate::platform::{ArtifactSink, ImageFetcher, Level, Notification, Notifier};
use crate::rendering::fonts::FontBook;
use crate::stage::{NodeHandle, Stage};
use crate::stats::UserStats;
use crate::{Config, LookupError, Viewport, ViewportClass};

/// Where the lookup flow currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Loading { username: String },
    Loaded { stats: Arc<UserStats> },
    NotFound { username: String },
    Failed { message: String },
}

/// The confetti burst shown after a successful lookup on wide screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Celebration {
    Hidden,
    Burst,
}

pub struct Session {
    config: Config,
    provider: Arc<dyn StatsProvider>,
    notifier: Arc<dyn Notifier>,
    stage: Stage,
    engine: ExportEngine,
    state: SessionState,
    viewport: Viewport,
}

impl Session {
    pub fn new(
        config: Config,
        provider: Arc<dyn StatsProvider>,
        images: Arc<dyn ImageFetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let viewport = config.viewport;
        let stage = Stage::new(images, FontBook::new(config.fonts.clone()), viewport.class());
        let engine = ExportEngine::new(config.export.clone());
        Self {
            config,
            provider,
            notifier,
            stage,
            engine,
            state: SessionState::Idle,
            viewport,
        }
    }

    /// Swap the capture engine (e.g. a custom rasterizer).
    pub fn with_engine(mut self, engine: ExportEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn stats(&self) -> Option<&Arc<UserStats>> {
        match &self.state {
            SessionState::Loaded { stats } => Some(stats),
            _ => None,
        }
    }

    pub fn celebration(&self) -> Celebration {
        match (&self.state, self.viewport.class()) {
            (SessionState::Loaded { .. }, ViewportClass::Wide) => Celebration::Burst,
            _ => Celebration::Hidden,
        }
    }

    pub fn handle(&self) -> Option<NodeHandle> {
        self.stage.handle()
    }

    pub fn engine(&self) -> &ExportEngine {
        &self.engine
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.stage.resize(viewport);
    }

    /// Unmount the certificate and return to idle.
    pub fn clear(&mut self) {
        self.stage.unmount();
        self.state = SessionState::Idle;
    }

    fn post(&self, level: Level, title: &str, detail: Option<String>) {
        let mut n = Notification::new(level, title);
        if let Some(detail) = detail {
            n = n.with_detail(detail);
        }
        self.notifier.notify(n);
    }

    /// Look `username` up and mount its certificate.
    ///
    /// A blank username only posts a warning; the current certificate stays.
    pub async fn submit(&mut self, username: &str) -> &SessionState {
        let username = username.trim();
        if username.is_empty() {
            self.post(Level::Warning, "Please enter a username", None);
            return &self.state;
        }

        self.stage.unmount();
        self.state = SessionState::Loading {
            username: username.to_string(),
        };

        let result = self.provider.lookup(username).await;
        self.state = match result {
            Ok(stats) => match self.stage.mount(&stats) {
                Ok(_) => {
                    log::info!("loaded statistics for {:?}", stats.name);
                    SessionState::Loaded { stats: Arc::new(stats) }
                }
                Err(e) => {
                    self.post(Level::Error, "Unable to fetch user", Some(e.to_string()));
                    SessionState::Failed { message: e.to_string() }
                }
            },
            Err(LookupError::UserNotFound(name)) => {
                self.post(
                    Level::Warning,
                    "User not found",
                    Some(LookupError::UserNotFound(name.clone()).to_string()),
                );
                SessionState::NotFound { username: name }
            }
            Err(LookupError::EmptyUsername) => {
                self.post(Level::Warning, "Please enter a username", None);
                SessionState::Idle
            }
            Err(e @ LookupError::LookupFailed(_)) => {
                self.post(Level::Error, "Unable to fetch user", Some(e.to_string()));
                SessionState::Failed { message: e.to_string() }
            }
        };
        &self.state
    }

    /// Export the mounted certificate into `sink`.
    pub async fn export(&self, format: ArtifactFormat, sink: &dyn ArtifactSink) -> Result<SavedArtifact, ExportError> {
        let result = match self.stage.handle() {
            Some(handle) => self.engine.download(&handle, format, sink).await,
            None => Err(ExportError::Detached),
        };
        match &result {
            Ok(saved) => self.post(
                Level::Success,
                "Certificate downloaded",
                Some(saved.location.clone()),
            ),
            Err(e) => self.post(Level::Error, e.title(), Some(e.to_string())),
        }
        result
    }
}
