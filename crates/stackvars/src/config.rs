//! Project configuration
//!
//! Read from `stackvars.yaml` in the project directory, every key is optional:
//!
//! ```yaml
//! defaults:
//!   environment: usgw1-dev-devops
//!   stack_path_template: ./app/stacks/{{stack}}
//!   tfvars_dir: config/terraform/tfvars
//! expansions:
//!   ":REGION": us-gov-west-1
//! ```
//!
//! Per environment settings live in `environments/<env>.yaml`. Their `expansions` take precedence
//! over the project wide ones.
use crate::expansion::{Expansions, ENV_TOKEN};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "stackvars.yaml";
pub const ENVIRONMENTS_DIR: &str = "environments";

pub const DEFAULT_ENVIRONMENT: &str = "usgw1-dev-devops";
pub const DEFAULT_STACK_PATH_TEMPLATE: &str = "./app/stacks/{{stack}}";
pub const DEFAULT_TFVARS_DIR: &str = "config/terraform/tfvars";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub defaults: Defaults,
    pub expansions: BTreeMap<String, String>,
    #[serde(skip)]
    pub environments: BTreeMap<String, EnvironmentConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Defaults {
    pub environment: String,
    pub stack_path_template: String,
    pub tfvars_dir: PathBuf,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            stack_path_template: DEFAULT_STACK_PATH_TEMPLATE.to_string(),
            tfvars_dir: PathBuf::from(DEFAULT_TFVARS_DIR),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub name: Option<String>,
    pub description: Option<String>,
    pub expansions: BTreeMap<String, String>,
}

impl Config {
    /// Loads `stackvars.yaml` and `environments/<environment>.yaml` from `dir`
    ///
    /// Missing files fall back to defaults.
    pub fn load(dir: &Path, environment: Option<&str>) -> Result<Self, ConfigError> {
        let mut config: Config = read_yaml(&dir.join(CONFIG_FILE))?.unwrap_or_default();

        let environment = environment.unwrap_or(&config.defaults.environment).to_string();
        let env_path = dir
            .join(ENVIRONMENTS_DIR)
            .join(format!("{environment}.yaml"));
        if let Some(env_config) = read_yaml::<EnvironmentConfig>(&env_path)? {
            config.environments.insert(environment, env_config);
        }

        Ok(config)
    }

    /// `{{stack}}` in the stack path template replaced by `stack`
    pub fn stack_path(&self, stack: &str) -> PathBuf {
        PathBuf::from(self.defaults.stack_path_template.replace("{{stack}}", stack))
    }

    /// The placeholder table for `environment`
    ///
    /// Project expansions, overridden by environment expansions. `:ENV` always resolves to the
    /// environment itself.
    pub fn expansions(&self, environment: &str) -> Expansions {
        let mut expansions = Expansions::default();
        for (token, value) in &self.expansions {
            expansions.insert(token.as_str(), value.as_str());
        }

        if let Some(env_config) = self.environments.get(environment) {
            for (token, value) in &env_config.expansions {
                expansions.insert(token.as_str(), value.as_str());
            }
        }

        expansions.insert(ENV_TOKEN, environment);
        expansions
    }
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path=%path.display(), "no config file");
            return Ok(None);
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_owned(),
                source,
            })
        }
    };

    tracing::info!(path=%path.display(), "loading config");
    serde_yaml::from_str(&text)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read config file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_without_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load(dir.path(), None).expect("loads");

        assert_eq!(config, Config::default());
        assert_eq!(config.defaults.environment, DEFAULT_ENVIRONMENT);
        assert_eq!(config.stack_path("web"), PathBuf::from("./app/stacks/web"));
        assert_eq!(
            config.expansions("dev").get(ENV_TOKEN),
            Some("dev")
        );
    }

    #[test]
    fn project_and_environment_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"
defaults:
  environment: staging
  stack_path_template: stacks/{{stack}}/terraform
expansions:
  ":REGION": us-east-1
  ":OWNER": platform
"#,
        )
        .expect("write");
        std::fs::create_dir(dir.path().join(ENVIRONMENTS_DIR)).expect("mkdir");
        std::fs::write(
            dir.path().join(ENVIRONMENTS_DIR).join("staging.yaml"),
            r#"
name: staging
expansions:
  ":REGION": us-gov-west-1
"#,
        )
        .expect("write");

        let config = Config::load(dir.path(), None).expect("loads");
        assert_eq!(config.defaults.environment, "staging");
        assert_eq!(config.defaults.tfvars_dir, PathBuf::from(DEFAULT_TFVARS_DIR));
        assert_eq!(
            config.stack_path("web"),
            PathBuf::from("stacks/web/terraform")
        );

        let expansions = config.expansions("staging");
        assert_eq!(expansions.get(":REGION"), Some("us-gov-west-1"));
        assert_eq!(expansions.get(":OWNER"), Some("platform"));
        assert_eq!(expansions.get(ENV_TOKEN), Some("staging"));
    }

    #[test]
    fn invalid_config_names_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE), "defaults: [not, a, map]").expect("write");

        let err = Config::load(dir.path(), None).expect_err("must fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE));
    }
}
