//! HTTP(s) inventory source.
//!
//! Reads inventories from webservers (GitLab Pages, GitLab artifacts, S3, ...).
//! The endpoint must return the same JSON as `ansible-inventory --list`,
//! including `_meta.hostvars`. Configured through a YAML file named
//! `http_inventory.yml` / `http_inventory.yaml`, with `HTTP_*` environment
//! variables taking precedence over the file.

pub mod error;
pub mod gitlab;
pub mod keyed;
pub mod options;
pub mod populate;
pub mod transport;

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::inventory::InventorySink;

pub use error::{Result, SourceError};
pub use options::{AuthMethod, Credentials, EnvProvider, FileProvider, LayeredOptions, PluginConfig};
pub use transport::{ReqwestTransport, Transport};

/// File name suffixes this source claims.
pub const CONFIG_SUFFIXES: [&str; 2] = ["http_inventory.yaml", "http_inventory.yml"];

/// Whether `path` is a config file this source can consume.
pub fn verify_file(path: &Path) -> bool {
    path.is_file()
        && path
            .to_str()
            .is_some_and(|p| CONFIG_SUFFIXES.iter().any(|s| p.ends_with(s)))
}

pub struct HttpInventorySource<T: Transport> {
    transport: T,
    env: EnvProvider,
}

impl HttpInventorySource<ReqwestTransport> {
    /// Real network, options from the process environment.
    pub fn from_env() -> Self {
        Self::new(ReqwestTransport, EnvProvider::from_env())
    }
}

impl<T: Transport> HttpInventorySource<T> {
    pub fn new(transport: T, env: EnvProvider) -> Self {
        Self { transport, env }
    }

    /// Load the config file at `path` and populate `sink` from the endpoint.
    pub fn parse<S: InventorySink + ?Sized>(&self, sink: &mut S, path: &Path) -> Result<()> {
        if !verify_file(path) {
            return Err(SourceError::Configuration(format!(
                "{} is not an http inventory config, file name must end with {}",
                path.display(),
                CONFIG_SUFFIXES.join(" or ")
            )));
        }
        let config = PluginConfig::load(path)?;
        self.parse_config(sink, &config)
    }

    pub fn parse_config<S: InventorySink + ?Sized>(
        &self,
        sink: &mut S,
        config: &PluginConfig,
    ) -> Result<()> {
        config.check_plugin()?;
        let options = LayeredOptions::new(vec![
            Box::new(self.env.clone()),
            Box::new(FileProvider::from(config)),
        ]);
        let creds = options.resolve()?;

        let data = self.fetch(&creds)?.ok_or_else(|| {
            SourceError::Parse("did not receive any data. Can not parse inventory.".to_string())
        })?;

        populate::populate(sink, &data)?;

        if !config.keyed_groups.is_empty() {
            if let Some(doc) = data.as_object() {
                keyed::add_keyed_groups(
                    sink,
                    populate::hostvars(doc)?,
                    &config.keyed_groups,
                    config.strict,
                )?;
            }
        }
        Ok(())
    }

    /// `Ok(None)` when the auth method is not one we know how to use.
    pub fn fetch(&self, creds: &Credentials) -> Result<Option<Value>> {
        let response = match &creds.auth_method {
            AuthMethod::None | AuthMethod::Basic => {
                debug!(
                    "Auth Method is {}. Using generic page parser",
                    creds.auth_method
                );
                let mut session = self.transport.session()?;
                session.get(&creds.url, creds.basic_pair())?
            }
            AuthMethod::Gitlab => {
                debug!(
                    "Auth Method is {}. Using gitlab page parser",
                    creds.auth_method
                );
                gitlab::fetch(
                    &self.transport,
                    &creds.url,
                    creds.username.as_deref(),
                    creds.password.as_deref(),
                )?
            }
            AuthMethod::Unsupported(method) => {
                warn!(method = %method, "unsupported auth_method, nothing fetched");
                return Ok(None);
            }
        };

        populate::validate_response(&creds.url, &response).map(Some)
    }
}
