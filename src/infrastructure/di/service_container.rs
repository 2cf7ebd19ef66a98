//! Service container for dependency injection
//!
//! Wires up the navigation service and the data source it reads from.

use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::application::services::NavigationService;
use crate::application::ApplicationError;
use crate::config::Settings;
use crate::domain::{bundled, KeyOrder, NavData};
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::InfraResult;

/// Where navigation data comes from for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Snapshot compiled into the binary
    Bundled,
    /// Data file, or documentation directory containing it
    Path(PathBuf),
}

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    pub navigation: NavigationService,

    source: DataSource,
    loaded: OnceCell<NavData>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings, source: DataSource) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem), source)
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>, source: DataSource) -> Self {
        let settings = Arc::new(settings);
        let navigation = NavigationService::new(fs.clone(), settings.clone());

        Self {
            settings,
            fs,
            navigation,
            source,
            loaded: OnceCell::new(),
        }
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// Navigation data for this run, loaded on first use.
    pub fn nav_data(&self) -> InfraResult<&NavData> {
        match &self.source {
            DataSource::Bundled => match self.settings.key_order {
                KeyOrder::Bytewise => {
                    debug!("nav_data: shared bundled snapshot");
                    Ok(bundled::nav_data().map_err(ApplicationError::from)?)
                }
                order => Ok(self.loaded.get_or_try_init(|| {
                    debug!("nav_data: bundled snapshot with {} keys", order);
                    bundled::load_ordered(order).map_err(ApplicationError::from)
                })?),
            },
            DataSource::Path(path) => Ok(self
                .loaded
                .get_or_try_init(|| self.navigation.load(path))?),
        }
    }

    /// Directory holding shard pages and child scripts; `None` for the bundled snapshot.
    pub fn doc_dir(&self) -> Option<PathBuf> {
        match &self.source {
            DataSource::Bundled => None,
            DataSource::Path(path) => Some(self.navigation.doc_dir(path)),
        }
    }

    /// Data file path; `None` for the bundled snapshot.
    pub fn data_path(&self) -> Option<PathBuf> {
        match &self.source {
            DataSource::Bundled => None,
            DataSource::Path(path) => Some(self.navigation.data_path(path)),
        }
    }
}
