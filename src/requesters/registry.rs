use std::collections::HashMap;
use std::sync::Arc;

use super::Requester;
use super::aws_sm::AwsSecretsManagerRequester;
use super::aws_smp::AwsParameterStoreRequester;
use super::blob::BlobRequester;
use super::boltdb::BoltDbRequester;
use super::consul::ConsulRequester;
use super::env::EnvRequester;
use super::file::FileRequester;
use super::git::GitRequester;
use super::http::HttpRequester;
use super::merge::MergeRequester;
use super::stdin::StdinRequester;
use crate::builders::{
    BoltDbUrlBuilder, GitUrlBuilder, HttpUrlBuilder, NoopUrlBuilder, PathJoinFlavor,
    PathJoinUrlBuilder, UrlBuilder,
};
use crate::error::{DatasourceError, Result};

/// Registry of requesters and URL builders, keyed by URL scheme
///
/// Built once and shared through the request [`Context`](crate::Context),
/// so tests can swap in fake backends without touching global state.
pub struct Registry {
    requesters: HashMap<String, Arc<dyn Requester>>,
    builders: HashMap<String, Arc<dyn UrlBuilder>>,
}

impl Registry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self {
            requesters: HashMap::new(),
            builders: HashMap::new(),
        }
    }

    /// Creates a registry with every built-in backend registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register_requester(Arc::new(FileRequester));
        registry.register_requester(Arc::new(HttpRequester));
        registry.register_requester(Arc::new(BlobRequester::new()));
        registry.register_requester(Arc::new(AwsSecretsManagerRequester::new()));
        registry.register_requester(Arc::new(AwsParameterStoreRequester::new()));
        registry.register_requester(Arc::new(BoltDbRequester::new()));
        registry.register_requester(Arc::new(ConsulRequester::new()));
        registry.register_requester(Arc::new(GitRequester::new()));
        registry.register_requester(Arc::new(EnvRequester));
        registry.register_requester(Arc::new(StdinRequester::new()));
        registry.register_requester(Arc::new(MergeRequester::new()));

        registry.register_builder(&["stdin", "env", "merge"], Arc::new(NoopUrlBuilder));
        registry.register_builder(&["boltdb"], Arc::new(BoltDbUrlBuilder));
        registry.register_builder(&["http", "https"], Arc::new(HttpUrlBuilder));
        registry.register_builder(
            &["file", "consul", "consul+http", "consul+https"],
            Arc::new(PathJoinUrlBuilder::new(PathJoinFlavor::Full)),
        );
        registry.register_builder(
            &["aws+sm", "aws+smp", "s3", "gs"],
            Arc::new(PathJoinUrlBuilder::new(PathJoinFlavor::Stripped)),
        );
        registry.register_builder(
            &["git", "git+file", "git+http", "git+https", "git+ssh"],
            Arc::new(GitUrlBuilder),
        );

        registry
    }

    /// Registers a requester for every scheme it serves, replacing any
    /// previous requester for those schemes
    pub fn register_requester(&mut self, requester: Arc<dyn Requester>) {
        for scheme in requester.schemes() {
            self.requesters
                .insert((*scheme).to_string(), Arc::clone(&requester));
        }
    }

    pub fn register_builder(&mut self, schemes: &[&str], builder: Arc<dyn UrlBuilder>) {
        for scheme in schemes {
            self.builders
                .insert((*scheme).to_string(), Arc::clone(&builder));
        }
    }

    pub fn requester(&self, scheme: &str) -> Result<Arc<dyn Requester>> {
        self.requesters
            .get(scheme)
            .cloned()
            .ok_or_else(|| DatasourceError::UnregisteredScheme {
                kind: "requester",
                scheme: scheme.to_string(),
            })
    }

    pub fn builder(&self, scheme: &str) -> Result<Arc<dyn UrlBuilder>> {
        self.builders
            .get(scheme)
            .cloned()
            .ok_or_else(|| DatasourceError::UnregisteredScheme {
                kind: "URL builder",
                scheme: scheme.to_string(),
            })
    }

    /// Returns the schemes that have both a requester and a URL builder, sorted
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self
            .requesters
            .keys()
            .filter(|s| self.builders.contains_key(*s))
            .cloned()
            .collect();
        schemes.sort();
        schemes
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
