use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::fmt;
use std::str::FromStr;

const LIVE_BASE_URL: &str = "https://api.ig.com/gateway/deal";
const DEMO_BASE_URL: &str = "https://demo-api.ig.com/gateway/deal";

/// Which IG environment the credentials belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountType {
    Live,
    #[default]
    Demo,
}

impl AccountType {
    /// Gateway URL every endpoint path is appended to
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Live => LIVE_BASE_URL,
            Self::Demo => DEMO_BASE_URL,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Demo => "demo",
        }
    }
}

impl FromStr for AccountType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "demo" => Ok(Self::Demo),
            other => Err(ConfigError::InvalidConfiguration(format!(
                "Invalid account type '{}', please provide LIVE or DEMO",
                other
            ))),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login credentials for one IG account. Immutable once built.
#[derive(Debug, Clone)]
pub struct IgConfig {
    pub username: String,
    pub password: Secret<String>,
    pub api_key: Secret<String>,
    pub acc_number: Option<String>,
    pub acc_type: AccountType,
    pub base_url: Option<String>,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for IgConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("IgConfig", 6)?;
        state.serialize_field("username", &self.username)?;
        state.serialize_field("password", "[REDACTED]")?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("acc_number", &self.acc_number)?;
        state.serialize_field("acc_type", self.acc_type.as_str())?;
        state.serialize_field("base_url", &self.base_url)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for IgConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct IgConfigHelper {
            username: String,
            password: String,
            api_key: String,
            acc_number: Option<String>,
            acc_type: Option<String>,
            base_url: Option<String>,
        }

        let helper = IgConfigHelper::deserialize(deserializer)?;
        let acc_type = match helper.acc_type {
            Some(raw) => raw.parse().map_err(serde::de::Error::custom)?,
            None => AccountType::default(),
        };
        Ok(Self {
            username: helper.username,
            password: Secret::new(helper.password),
            api_key: Secret::new(helper.api_key),
            acc_number: helper.acc_number,
            acc_type,
            base_url: helper.base_url,
        })
    }
}

impl IgConfig {
    /// Create a demo-account configuration with the given credentials
    #[must_use]
    pub fn new(username: String, password: String, api_key: String) -> Self {
        Self {
            username,
            password: Secret::new(password),
            api_key: Secret::new(api_key),
            acc_number: None,
            acc_type: AccountType::Demo,
            base_url: None,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_USERNAME`
    /// - `{PREFIX}_PASSWORD`
    /// - `{PREFIX}_API_KEY`
    /// - `{PREFIX}_ACC_NUMBER` (optional, required for v3 sessions)
    /// - `{PREFIX}_ACC_TYPE` (optional, `live` or `demo`, defaults to demo)
    /// - `{PREFIX}_BASE_URL` (optional)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let required = |name: &str| {
            let var = format!("{}_{}", prefix, name);
            env::var(&var).map_err(|_| ConfigError::MissingEnvironmentVariable(var))
        };

        let username = required("USERNAME")?;
        let password = required("PASSWORD")?;
        let api_key = required("API_KEY")?;
        let acc_number = env::var(format!("{}_ACC_NUMBER", prefix))
            .ok()
            .filter(|s| !s.is_empty());
        let acc_type = match env::var(format!("{}_ACC_TYPE", prefix)) {
            Ok(raw) => raw.parse()?,
            Err(_) => AccountType::Demo,
        };
        let base_url = env::var(format!("{}_BASE_URL", prefix)).ok();

        Ok(Self {
            username,
            password: Secret::new(password),
            api_key: Secret::new(api_key),
            acc_number,
            acc_type,
            base_url,
        })
    }

    /// Create configuration from a .env file and environment variables
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(_) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // fall back to the process environment
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    /// Set the account number (needed for v3 sessions)
    #[must_use]
    pub fn acc_number(mut self, acc_number: String) -> Self {
        self.acc_number = Some(acc_number);
        self
    }

    #[must_use]
    pub const fn acc_type(mut self, acc_type: AccountType) -> Self {
        self.acc_type = acc_type;
        self
    }

    /// Point the client at a different gateway, e.g. a stub server
    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// The gateway URL: the override if set, otherwise the account type's
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.acc_type.base_url().to_string())
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get password (use carefully - exposes secret)
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_parsing() {
        assert_eq!("LIVE".parse::<AccountType>().unwrap(), AccountType::Live);
        assert_eq!("demo".parse::<AccountType>().unwrap(), AccountType::Demo);
        let err = "paper".parse::<AccountType>().unwrap_err();
        assert!(err.to_string().contains("paper"));
    }

    #[test]
    fn test_base_url_resolution() {
        let config = IgConfig::new("user".into(), "pass".into(), "key".into());
        assert_eq!(
            config.resolved_base_url(),
            "https://demo-api.ig.com/gateway/deal"
        );

        let live = config.clone().acc_type(AccountType::Live);
        assert_eq!(live.resolved_base_url(), "https://api.ig.com/gateway/deal");

        let stub = config.base_url("http://127.0.0.1:8080".into());
        assert_eq!(stub.resolved_base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_serialization_redacts_secrets() {
        let config = IgConfig::new("user".into(), "hunter2".into(), "abc123".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("abc123"));
        assert!(json.contains("[REDACTED]"));
    }

    #[test]
    fn test_deserialize_defaults_to_demo() {
        let config: IgConfig = serde_json::from_str(
            r#"{"username":"u","password":"p","api_key":"k","acc_number":"ABC12"}"#,
        )
        .unwrap();
        assert_eq!(config.acc_type, AccountType::Demo);
        assert_eq!(config.acc_number.as_deref(), Some("ABC12"));
        assert_eq!(config.password(), "p");
    }
}
