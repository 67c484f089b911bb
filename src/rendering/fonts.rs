//! Font database shared by every capture.

use std::sync::Arc;

use resvg::usvg::fontdb::Database;
use tokio::sync::OnceCell;

use crate::error::ExportError;
use crate::FontConfig;

/// Lazily loaded font database. Cloning shares the same load.
#[derive(Debug, Clone)]
pub struct FontBook {
    config: FontConfig,
    allow_no_faces: bool,
    cell: Arc<OnceCell<Arc<Database>>>,
}

impl FontBook {
    pub fn new(config: FontConfig) -> Self {
        Self {
            config,
            allow_no_faces: false,
            cell: Arc::new(OnceCell::new()),
        }
    }

    /// A book that never touches the filesystem and is allowed to stay
    /// empty. Text is laid out but not drawn; only for captures where the
    /// glyphs do not matter.
    pub fn empty() -> Self {
        let mut book = Self::new(FontConfig {
            load_system: false,
            dirs: Vec::new(),
            ..FontConfig::default()
        });
        book.allow_no_faces = true;
        book
    }

    pub fn family(&self) -> &str {
        &self.config.family
    }

    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }

    /// Wait for the database; the first caller loads it off the async thread.
    ///
    /// A database without a single face would render every text run as
    /// nothing, so it is reported as `RenderIncomplete` and not cached.
    pub async fn ready(&self) -> Result<Arc<Database>, ExportError> {
        let db = self
            .cell
            .get_or_try_init(|| async {
                let config = self.config.clone();
                let db = tokio::task::spawn_blocking(move || load(&config))
                    .await
                    .map_err(|e| ExportError::RenderIncomplete(format!("font loading aborted: {}", e)))?;
                if db.len() == 0 && !self.allow_no_faces {
                    log::error!("no usable fonts (system fonts: {}, dirs: {:?})", self.config.load_system, self.config.dirs);
                    return Err(ExportError::RenderIncomplete(
                        "no fonts available; certificate text cannot be drawn".into(),
                    ));
                }
                Ok(Arc::new(db))
            })
            .await?;
        Ok(db.clone())
    }
}

fn load(config: &FontConfig) -> Database {
    let mut db = Database::new();
    if config.load_system {
        db.load_system_fonts();
    }
    for dir in &config.dirs {
        if dir.is_dir() {
            db.load_fonts_dir(dir);
        } else {
            log::warn!("font directory {} does not exist", dir.display());
        }
    }
    log::debug!("loaded {} font faces", db.len());
    db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_book_loads_once() {
        let book = FontBook::empty();
        assert!(!book.is_ready());
        let a = book.ready().await.unwrap();
        let b = book.clone().ready().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 0);
        assert!(book.is_ready());
    }

    #[tokio::test]
    async fn missing_font_dir_is_render_incomplete() {
        let book = FontBook::new(FontConfig {
            load_system: false,
            dirs: vec!["/definitely/not/here".into()],
            ..FontConfig::default()
        });
        let err = book.ready().await.unwrap_err();
        assert!(matches!(err, ExportError::RenderIncomplete(_)));
        assert!(!book.is_ready());
    }
}
