use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use super::error::{Result, SourceError};

/// Accepted values of the `plugin` discriminator.
pub const PLUGIN_NAMES: [&str; 2] = ["http", "derjd.general.http"];

/// Option name and the environment variable that overrides it.
pub const OPTION_ENV: [(&str, &str); 4] = [
    ("url", "HTTP_URL"),
    ("auth_method", "HTTP_AUTH_METHOD"),
    ("username", "HTTP_USERNAME"),
    ("password", "HTTP_PASSWORD"),
];

/// Contents of an `http_inventory.yml` file.
#[derive(Debug, Deserialize, Clone)]
pub struct PluginConfig {
    pub plugin: String,
    pub url: Option<String>,
    pub auth_method: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Fail instead of skipping when a keyed group cannot be built
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub keyed_groups: Vec<KeyedGroup>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct KeyedGroup {
    /// Dotted path into the host's variables
    pub key: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_separator")]
    pub separator: String,
    pub parent_group: Option<String>,
    pub default_value: Option<String>,
    #[serde(default = "yes")]
    pub trailing_separator: bool,
    #[serde(default = "yes")]
    pub leading_separator: bool,
}

fn default_separator() -> String {
    "_".to_string()
}

fn yes() -> bool {
    true
}

impl PluginConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&contents)?;
        config.check_plugin()?;
        Ok(config)
    }

    pub fn check_plugin(&self) -> Result<()> {
        if PLUGIN_NAMES.contains(&self.plugin.as_str()) {
            Ok(())
        } else {
            Err(SourceError::Configuration(format!(
                "plugin '{}' is not handled here, expected one of: {}",
                self.plugin,
                PLUGIN_NAMES.join(", ")
            )))
        }
    }
}

/// One layer of option values.
pub trait OptionProvider {
    fn name(&self) -> &str;
    fn get(&self, option: &str) -> Option<String>;
}

/// Options taken from `HTTP_*` environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvProvider {
    vars: HashMap<String, String>,
}

impl EnvProvider {
    /// Snapshot the relevant variables of the current process.
    pub fn from_env() -> Self {
        Self::from_pairs(
            OPTION_ENV
                .iter()
                .filter_map(|(_, var)| std::env::var(var).ok().map(|v| (var.to_string(), v))),
        )
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl OptionProvider for EnvProvider {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, option: &str) -> Option<String> {
        let (_, var) = OPTION_ENV.iter().find(|(name, _)| *name == option)?;
        self.vars.get(*var).cloned()
    }
}

/// Options declared in the plugin configuration file.
#[derive(Debug, Clone, Default)]
pub struct FileProvider {
    values: HashMap<String, String>,
}

impl From<&PluginConfig> for FileProvider {
    fn from(config: &PluginConfig) -> Self {
        let mut values = HashMap::new();
        for (name, value) in [
            ("url", &config.url),
            ("auth_method", &config.auth_method),
            ("username", &config.username),
            ("password", &config.password),
        ] {
            if let Some(v) = value {
                values.insert(name.to_string(), v.clone());
            }
        }
        Self { values }
    }
}

impl OptionProvider for FileProvider {
    fn name(&self) -> &str {
        "config file"
    }

    fn get(&self, option: &str) -> Option<String> {
        self.values.get(option).cloned()
    }
}

/// Ordered stack of providers; the first non-empty value wins.
pub struct LayeredOptions {
    providers: Vec<Box<dyn OptionProvider>>,
}

impl LayeredOptions {
    pub fn new(providers: Vec<Box<dyn OptionProvider>>) -> Self {
        Self { providers }
    }

    pub fn get(&self, option: &str) -> Option<String> {
        self.providers.iter().find_map(|p| {
            let value = p.get(option).filter(|v| !v.is_empty())?;
            debug!(option, source = p.name(), "resolved option");
            Some(value)
        })
    }

    pub fn resolve(&self) -> Result<Credentials> {
        let url = self.get("url").ok_or_else(|| {
            SourceError::Configuration(
                "url is missing. Please set it either as parameter or environment variable (HTTP_URL)"
                    .to_string(),
            )
        })?;

        Ok(Credentials {
            url,
            auth_method: AuthMethod::parse(self.get("auth_method").as_deref()),
            username: self.get("username"),
            password: self.get("password"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    None,
    Basic,
    Gitlab,
    Unsupported(String),
}

impl AuthMethod {
    /// `"None"` is what an unset option turns into once stringified by a
    /// config layer, so it means no auth as well.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None | Some("None") => AuthMethod::None,
            Some("basic") => AuthMethod::Basic,
            Some("gitlab") => AuthMethod::Gitlab,
            Some(other) => AuthMethod::Unsupported(other.to_string()),
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::None => write!(f, "None"),
            AuthMethod::Basic => write!(f, "basic"),
            AuthMethod::Gitlab => write!(f, "gitlab"),
            AuthMethod::Unsupported(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub url: String,
    pub auth_method: AuthMethod,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Username and password, only when both are set.
    pub fn basic_pair(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("auth_method", &self.auth_method)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_config(content: &str) -> PluginConfig {
        serde_yaml::from_str(content).unwrap()
    }

    fn layered(env: EnvProvider, config: &PluginConfig) -> LayeredOptions {
        LayeredOptions::new(vec![Box::new(env), Box::new(FileProvider::from(config))])
    }

    #[test]
    fn test_file_only() {
        let config = file_config(
            r#"
plugin: http
url: https://example.gitlab.io/inventory.json
auth_method: basic
username: deploy
password: s3cret
"#,
        );
        let creds = layered(EnvProvider::default(), &config).resolve().unwrap();
        assert_eq!(creds.url, "https://example.gitlab.io/inventory.json");
        assert_eq!(creds.auth_method, AuthMethod::Basic);
        assert_eq!(creds.basic_pair(), Some(("deploy", "s3cret")));
    }

    #[test]
    fn test_env_wins_over_file() {
        let config = file_config(
            r#"
plugin: http
url: https://file.example/inventory.json
username: from-file
"#,
        );
        let env = EnvProvider::from_pairs([
            ("HTTP_URL", "https://env.example/inventory.json"),
            ("HTTP_PASSWORD", "pw"),
        ]);
        let creds = layered(env, &config).resolve().unwrap();
        assert_eq!(creds.url, "https://env.example/inventory.json");
        assert_eq!(creds.username.as_deref(), Some("from-file"));
        assert_eq!(creds.password.as_deref(), Some("pw"));
        assert_eq!(creds.auth_method, AuthMethod::None);
    }

    #[test]
    fn test_empty_env_falls_through() {
        let config = file_config("plugin: http\nurl: https://file.example/\n");
        let env = EnvProvider::from_pairs([("HTTP_URL", "")]);
        let creds = layered(env, &config).resolve().unwrap();
        assert_eq!(creds.url, "https://file.example/");
    }

    #[test]
    fn test_missing_url() {
        let config = file_config("plugin: http\n");
        let err = layered(EnvProvider::default(), &config)
            .resolve()
            .unwrap_err();
        assert!(matches!(err, SourceError::Configuration(ref m) if m.contains("url is missing")));
    }

    #[test]
    fn test_auth_method_parse() {
        assert_eq!(AuthMethod::parse(None), AuthMethod::None);
        assert_eq!(AuthMethod::parse(Some("None")), AuthMethod::None);
        assert_eq!(AuthMethod::parse(Some("gitlab")), AuthMethod::Gitlab);
        assert_eq!(
            AuthMethod::parse(Some("oauth")),
            AuthMethod::Unsupported("oauth".into())
        );
    }

    #[test]
    fn test_basic_pair_needs_both() {
        let creds = Credentials {
            url: "http://x".into(),
            auth_method: AuthMethod::Basic,
            username: Some("u".into()),
            password: None,
        };
        assert_eq!(creds.basic_pair(), None);
    }

    #[test]
    fn test_password_redacted_in_debug() {
        let creds = Credentials {
            url: "http://x".into(),
            auth_method: AuthMethod::Basic,
            username: Some("u".into()),
            password: Some("hunter2".into()),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }

    #[test]
    fn test_plugin_name_checked() {
        assert!(file_config("plugin: derjd.general.http\n").check_plugin().is_ok());
        assert!(matches!(
            file_config("plugin: aws_ec2\n").check_plugin(),
            Err(SourceError::Configuration(_))
        ));
    }

    #[test]
    fn test_keyed_group_defaults() {
        let config = file_config(
            r#"
plugin: http
keyed_groups:
  - key: role
"#,
        );
        let kg = &config.keyed_groups[0];
        assert_eq!(kg.prefix, "");
        assert_eq!(kg.separator, "_");
        assert!(kg.trailing_separator);
        assert!(kg.leading_separator);
        assert!(!config.strict);
    }
}
