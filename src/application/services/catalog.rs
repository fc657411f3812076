//! Talent catalog service
//!
//! Loads tree definitions from TOML and turns them into a validated build.
//! The rule engine never touches files; this is the host side of the load step.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{Build, BuildBuilder, Rules, TreeDef};
use crate::infrastructure::traits::FileSystem;

/// Catalog shipped with the binary, used when no catalog is configured.
pub const BUNDLED_CATALOG: &str = include_str!("../../../catalogs/warrior.toml");

/// Parsed catalog file: trees in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub trees: Vec<TreeDef>,
}

impl Catalog {
    pub fn parse(content: &str, origin: &Path) -> ApplicationResult<Self> {
        toml::from_str(content).map_err(|e| ApplicationError::Catalog {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validates the definitions and returns a build with every rank at 0.
    pub fn into_build(self, rules: Rules) -> ApplicationResult<Build> {
        Ok(BuildBuilder::new(rules).trees(self.trees).build()?)
    }
}

/// Service for loading talent catalogs.
pub struct CatalogService {
    fs: Arc<dyn FileSystem>,
    rules: Rules,
}

impl CatalogService {
    /// Create a new catalog service.
    pub fn new(fs: Arc<dyn FileSystem>, rules: Rules) -> Self {
        Self { fs, rules }
    }

    pub fn rules(&self) -> Rules {
        self.rules
    }

    /// Load a catalog file into a fresh build.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<Build> {
        if !self.fs.exists(path) {
            return Err(ApplicationError::OperationFailed {
                context: format!("catalog not found: {}", path.display()),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "file does not exist",
                )),
            });
        }
        let content =
            self.fs
                .read_to_string(path)
                .map_err(|e| ApplicationError::OperationFailed {
                    context: format!("read catalog {}", path.display()),
                    source: Box::new(e),
                })?;
        let catalog = Catalog::parse(&content, path)?;
        debug!("load: {} trees in {}", catalog.trees.len(), path.display());
        catalog.into_build(self.rules)
    }

    /// Build from the catalog bundled with the binary.
    pub fn bundled(&self) -> ApplicationResult<Build> {
        Catalog::parse(BUNDLED_CATALOG, &PathBuf::from("<bundled>"))?.into_build(self.rules)
    }

    /// Load `path` when given, otherwise fall back to the bundled catalog.
    pub fn load_or_bundled(&self, path: Option<&Path>) -> ApplicationResult<Build> {
        match path {
            Some(p) => self.load(p),
            None => self.bundled(),
        }
    }
}
