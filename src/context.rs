use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::datasource::DataSource;
use crate::fs::{FileSystem, OsFileSystem};
use crate::globals;
use crate::requesters::Registry;

/// Everything a request needs besides the URL itself.
///
/// Cloning is cheap; all collaborators are shared.
#[derive(Clone)]
pub struct Context {
    registry: Arc<Registry>,
    fs: Arc<dyn FileSystem>,
    http_client: reqwest::Client,
    aliases: Arc<HashMap<String, DataSource>>,
    cancel: CancellationToken,
}

impl Context {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            fs: Arc::new(OsFileSystem),
            http_client: globals::http_client().clone(),
            aliases: Arc::new(HashMap::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = client;
        self
    }

    /// Datasources that `merge:` URLs may refer to by name
    pub fn with_aliases(mut self, aliases: HashMap<String, DataSource>) -> Self {
        self.aliases = Arc::new(aliases);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    pub fn aliases(&self) -> &HashMap<String, DataSource> {
        &self.aliases
    }

    pub fn alias(&self, name: &str) -> Option<&DataSource> {
        self.aliases.get(name)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Arc::new(Registry::with_defaults()))
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut aliases: Vec<&String> = self.aliases.keys().collect();
        aliases.sort();
        f.debug_struct("Context")
            .field("schemes", &self.registry.schemes())
            .field("aliases", &aliases)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
