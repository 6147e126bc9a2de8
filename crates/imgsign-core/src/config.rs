//! Server and object-store configuration.
//!
//! Configuration is read once at startup from environment variables and is
//! immutable afterwards. Required values that are absent or malformed make
//! [`ServerConfig::from_env`] fail, and the binary exits before binding.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `ACCESS_KEY` | *(required)* |
//! | `SECRET_KEY` | *(required)* |
//! | `ENDPOINT` | *(required)* |
//! | `BUCKET` | *(required)* |
//! | `DOCUMENT_ROOT` | *(required)* |
//! | `DURATION_HOUR` | `24` |
//! | `PORT` | `8080` |
//! | `LISTEN_HOST` | `0.0.0.0` |
//! | `REGION` | `us-east-1` |
//! | `SECURE` | `true` |
//! | `VIRTUAL_HOSTED_STYLE` | `false` |
//! | `SIGNATURE_VERSION` | `v4` |
//! | `REQUEST_TIMEOUT_SECS` | `30` |
//! | `LOG_LEVEL` | `info` |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use imgsign_auth::{AddressingStyle, Credentials, Presigner, SignatureVersion};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Longest link lifetime presigned URLs allow, in hours.
pub const MAX_DURATION_HOURS: u64 = 168;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set or is blank.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be used.
    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// The offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The document root cannot be resolved to an absolute path.
    #[error("document root {}: {source}", path.display())]
    DocumentRoot {
        /// The configured path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document root exists but is not a directory.
    #[error("document root {} is not a directory", path.display())]
    NotADirectory {
        /// The resolved path.
        path: PathBuf,
    },
}

/// Object store signing configuration.
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Access key ID.
    pub access_key: String,

    /// Secret key. Never serialized or printed.
    #[serde(skip_serializing, default)]
    pub secret_key: String,

    /// Store endpoint as `host[:port]`.
    pub endpoint: String,

    /// Bucket holding the images.
    pub bucket: String,

    /// Region used in the SigV4 credential scope.
    #[builder(default = String::from("us-east-1"))]
    pub region: String,

    /// Whether signed links use `https`.
    #[builder(default = true)]
    pub secure: bool,

    /// Whether the bucket goes into the host name instead of the path.
    #[builder(default = false)]
    pub virtual_hosted_style: bool,

    /// Query signing scheme.
    #[builder(default)]
    pub signature_version: SignatureVersion,

    /// Lifetime of each signed link, in hours.
    #[builder(default = 24)]
    pub duration_hours: u64,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &"...")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("secure", &self.secure)
            .field("virtual_hosted_style", &self.virtual_hosted_style)
            .field("signature_version", &self.signature_version)
            .field("duration_hours", &self.duration_hours)
            .finish()
    }
}

impl StoreConfig {
    /// How long each signed link stays valid.
    #[must_use]
    pub fn link_duration(&self) -> Duration {
        Duration::from_secs(self.duration_hours * 3600)
    }

    /// Build the [`Presigner`] described by this configuration.
    #[must_use]
    pub fn presigner(&self) -> Presigner {
        let style = if self.virtual_hosted_style {
            AddressingStyle::VirtualHosted
        } else {
            AddressingStyle::Path
        };

        Presigner::builder()
            .credentials(Credentials::new(&self.access_key, &self.secret_key))
            .endpoint(self.endpoint.clone())
            .bucket(self.bucket.clone())
            .region(self.region.clone())
            .secure(self.secure)
            .style(style)
            .version(self.signature_version)
            .build()
    }
}

/// Process-wide server configuration.
///
/// # Examples
///
/// ```
/// use imgsign_core::{ServerConfig, StoreConfig};
///
/// let config = ServerConfig::builder()
///     .document_root("/srv/www".into())
///     .store(
///         StoreConfig::builder()
///             .access_key("AKID".into())
///             .secret_key("secret".into())
///             .endpoint("s3.example.com".into())
///             .bucket("images".into())
///             .build(),
///     )
///     .build();
/// assert_eq!(config.listen_addr(), "0.0.0.0:8080");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Host or IP the listener binds to.
    #[builder(default = String::from("0.0.0.0"))]
    pub listen_host: String,

    /// Listen port.
    #[builder(default = 8080)]
    pub port: u16,

    /// Absolute, canonical directory that is served.
    pub document_root: PathBuf,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Upper bound for rendering one page, in seconds.
    #[builder(default = 30)]
    pub request_timeout_secs: u64,

    /// Object store signing settings.
    pub store: StoreConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// The document root is canonicalized here, so it must exist.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);

        let endpoint = vars.required("ENDPOINT")?;
        if endpoint.contains("://") || endpoint.contains('/') {
            return Err(ConfigError::Invalid {
                name: "ENDPOINT",
                value: endpoint,
                reason: "expected host[:port] without scheme or path".to_owned(),
            });
        }

        let duration_hours: u64 = vars.parsed("DURATION_HOUR", 24)?;
        if duration_hours == 0 || duration_hours > MAX_DURATION_HOURS {
            return Err(ConfigError::Invalid {
                name: "DURATION_HOUR",
                value: duration_hours.to_string(),
                reason: format!("must be between 1 and {MAX_DURATION_HOURS}"),
            });
        }

        let store = StoreConfig {
            access_key: vars.required("ACCESS_KEY")?,
            secret_key: vars.required("SECRET_KEY")?,
            endpoint,
            bucket: vars.required("BUCKET")?,
            region: vars.optional("REGION").unwrap_or_else(|| "us-east-1".to_owned()),
            secure: vars.flag("SECURE", true)?,
            virtual_hosted_style: vars.flag("VIRTUAL_HOSTED_STYLE", false)?,
            signature_version: vars.parsed("SIGNATURE_VERSION", SignatureVersion::V4)?,
            duration_hours,
        };

        let request_timeout_secs: u64 = vars.parsed("REQUEST_TIMEOUT_SECS", 30)?;
        if request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "REQUEST_TIMEOUT_SECS",
                value: "0".to_owned(),
                reason: "must be positive".to_owned(),
            });
        }

        Ok(Self {
            listen_host: vars
                .optional("LISTEN_HOST")
                .unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: vars.parsed("PORT", 8080)?,
            document_root: canonical_root(PathBuf::from(vars.required("DOCUMENT_ROOT")?))?,
            log_level: vars
                .optional("LOG_LEVEL")
                .unwrap_or_else(|| "info".to_owned()),
            request_timeout_secs,
            store,
        })
    }

    /// The `host:port` string the listener binds to.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.port)
    }

    /// Upper bound for rendering one page.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

struct Vars<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn parsed<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.optional(name) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                reason: e.to_string(),
                value,
            }),
        }
    }

    fn flag(&self, name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(name) {
            None => Ok(default),
            Some(value) => parse_bool(&value).ok_or_else(|| ConfigError::Invalid {
                name,
                value,
                reason: "expected a boolean".to_owned(),
            }),
        }
    }
}

/// Parse a boolean, accepting `1/true/yes` and `0/false/no` (case-insensitive).
fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn canonical_root(path: PathBuf) -> Result<PathBuf, ConfigError> {
    let root = path
        .canonicalize()
        .map_err(|source| ConfigError::DocumentRoot {
            path: path.clone(),
            source,
        })?;
    if !root.is_dir() {
        return Err(ConfigError::NotADirectory { path: root });
    }
    Ok(root)
}
