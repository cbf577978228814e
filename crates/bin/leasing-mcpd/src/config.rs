use clap::{Parser, ValueEnum, builder::BoolishValueParser};
use leasing_api::ApiServerConfig;
use leasing_api::allowlist::{DEFAULT_ALLOWED_HOSTS, DEFAULT_ALLOWED_ORIGINS};
use leasing_core::services::RegistryConfig;
use leasing_mcp::server::McpHttpConfig;
use std::error::Error;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_DATA_DIR: &str = "tenant-info";
const DEFAULT_CHARTS_DIR: &str = "charts";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DB_NAMESPACE: &str = "leasing";
const DEFAULT_DB_NAME: &str = "analytics";
const DEFAULT_SSE_KEEP_ALIVE_SECS: u64 = 15;
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG: &str = "info";

/// How the MCP server is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// MCP over stdin/stdout.
    Stdio,
    /// Streamable HTTP MCP endpoint plus the REST shim.
    #[value(alias = "sse")]
    Http,
}

#[derive(Parser, Debug)]
#[command(name = "leasing-mcpd", version, about = "Leasing analytics MCP daemon.")]
struct CliArgs {
    #[arg(long, env = "LEASING_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[arg(long, env = "LEASING_CHARTS_DIR", default_value = DEFAULT_CHARTS_DIR)]
    charts_dir: PathBuf,

    #[arg(long, env = "LEASING_TRANSPORT", value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,

    #[arg(long, env = "LEASING_HOST", default_value = DEFAULT_HOST)]
    host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(long, env = "LEASING_ALLOWED_HOSTS", value_delimiter = ',')]
    allowed_hosts: Option<Vec<String>>,

    #[arg(long, env = "LEASING_ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Option<Vec<String>>,

    #[arg(long, env = "LEASING_DB_NAMESPACE", default_value = DEFAULT_DB_NAMESPACE)]
    db_namespace: String,

    #[arg(long, env = "LEASING_DB_NAME", default_value = DEFAULT_DB_NAME)]
    db_name: String,

    #[arg(
        long,
        env = "LEASING_SSE_KEEP_ALIVE_SECS",
        default_value_t = DEFAULT_SSE_KEEP_ALIVE_SECS
    )]
    sse_keep_alive_secs: u64,

    #[arg(
        long,
        env = "LEASING_STATEFUL",
        default_value_t = true,
        value_parser = BoolishValueParser::new()
    )]
    stateful: bool,

    #[arg(
        long,
        env = "LEASING_TOOL_TIMEOUT_SECS",
        default_value_t = DEFAULT_TOOL_TIMEOUT_SECS
    )]
    tool_timeout_secs: u64,

    #[arg(long, env = "LEASING_LOG", default_value = DEFAULT_LOG)]
    log: String,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Debug, Clone)]
pub struct LeasingConfig {
    pub data_dir: PathBuf,
    pub charts_dir: PathBuf,
    pub transport: Transport,
    pub http_addr: SocketAddr,
    pub allowed_hosts: Vec<String>,
    pub allowed_origins: Vec<String>,
    pub db_namespace: String,
    pub db_name: String,
    pub sse_keep_alive: Option<Duration>,
    pub stateful: bool,
    pub tool_timeout: Duration,
    pub log_filter: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl LeasingConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::new(&self.data_dir)
            .with_charts_dir(&self.charts_dir)
            .with_namespace(&self.db_namespace)
            .with_database(&self.db_name)
    }

    pub fn api_config(&self) -> ApiServerConfig {
        let mcp = McpHttpConfig::new()
            .with_stateful_mode(self.stateful)
            .with_sse_keep_alive(self.sse_keep_alive);
        ApiServerConfig::new(self.http_addr)
            .with_request_timeout(self.tool_timeout)
            .with_allowed_hosts(self.allowed_hosts.clone())
            .with_allowed_origins(self.allowed_origins.clone())
            .with_mcp(mcp)
    }
}

/// Unset lists fall back to the loopback defaults; a list that is set but
/// holds only blanks disables the check.
fn pattern_list(values: Option<Vec<String>>, defaults: &[&str]) -> Vec<String> {
    values.map_or_else(
        || defaults.iter().map(ToString::to_string).collect(),
        |values| {
            values
                .into_iter()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .collect()
        },
    )
}

impl TryFrom<CliArgs> for LeasingConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.db_namespace.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "LEASING_DB_NAMESPACE",
                value: args.db_namespace,
            });
        }
        if args.db_name.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "LEASING_DB_NAME",
                value: args.db_name,
            });
        }
        if args.charts_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "LEASING_CHARTS_DIR",
                value: String::new(),
            });
        }
        if args.tool_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "LEASING_TOOL_TIMEOUT_SECS",
                value: args.tool_timeout_secs.to_string(),
            });
        }
        if EnvFilter::try_new(&args.log).is_err() {
            return Err(ConfigError::InvalidSetting {
                name: "LEASING_LOG",
                value: args.log,
            });
        }

        let sse_keep_alive = if args.sse_keep_alive_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(args.sse_keep_alive_secs))
        };

        Ok(Self {
            data_dir: args.data_dir,
            charts_dir: args.charts_dir,
            transport: args.transport,
            http_addr: SocketAddr::new(args.host, args.port),
            allowed_hosts: pattern_list(args.allowed_hosts, DEFAULT_ALLOWED_HOSTS),
            allowed_origins: pattern_list(args.allowed_origins, DEFAULT_ALLOWED_ORIGINS),
            db_namespace: args.db_namespace,
            db_name: args.db_name,
            sse_keep_alive,
            stateful: args.stateful,
            tool_timeout: Duration::from_secs(args.tool_timeout_secs),
            log_filter: args.log,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            charts_dir: PathBuf::from(DEFAULT_CHARTS_DIR),
            transport: Transport::Stdio,
            host: DEFAULT_HOST.parse().expect("valid host"),
            port: DEFAULT_PORT,
            allowed_hosts: None,
            allowed_origins: None,
            db_namespace: DEFAULT_DB_NAMESPACE.to_string(),
            db_name: DEFAULT_DB_NAME.to_string(),
            sse_keep_alive_secs: DEFAULT_SSE_KEEP_ALIVE_SECS,
            stateful: true,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            log: DEFAULT_LOG.to_string(),
        }
    }

    #[test]
    fn defaults_bind_all_interfaces_with_loopback_allow_list() {
        let config = LeasingConfig::try_from(base_args()).expect("config should parse");

        assert_eq!(config.http_addr, "0.0.0.0:8000".parse().expect("valid addr"));
        assert_eq!(config.allowed_hosts.len(), DEFAULT_ALLOWED_HOSTS.len());
        assert_eq!(config.allowed_origins.len(), DEFAULT_ALLOWED_ORIGINS.len());
        assert_eq!(config.sse_keep_alive, Some(Duration::from_secs(15)));
        assert_eq!(config.transport, Transport::Stdio);
    }

    #[test]
    fn blank_allow_list_disables_the_check() {
        let mut args = base_args();
        args.allowed_hosts = Some(vec![String::new()]);
        args.allowed_origins = Some(vec![" https://app.example ".to_string(), " ".to_string()]);

        let config = LeasingConfig::try_from(args).expect("config should parse");

        assert!(config.allowed_hosts.is_empty());
        assert_eq!(config.allowed_origins, vec!["https://app.example".to_string()]);
    }

    #[test]
    fn zero_keep_alive_disables_pings() {
        let mut args = base_args();
        args.sse_keep_alive_secs = 0;

        let config = LeasingConfig::try_from(args).expect("config should parse");

        assert!(config.sse_keep_alive.is_none());
        assert!(config.api_config().mcp.sse_keep_alive.is_none());
    }

    #[test]
    fn rejects_invalid_settings() {
        let mut args = base_args();
        args.tool_timeout_secs = 0;
        assert!(LeasingConfig::try_from(args).is_err());

        let mut args = base_args();
        args.db_namespace = "  ".to_string();
        assert!(LeasingConfig::try_from(args).is_err());

        let mut args = base_args();
        args.log = "leasing=loud".to_string();
        assert!(LeasingConfig::try_from(args).is_err());

        let mut args = base_args();
        args.charts_dir = PathBuf::new();
        assert!(LeasingConfig::try_from(args).is_err());
    }

    #[test]
    fn charts_dir_reaches_the_registry() {
        let mut args = base_args();
        args.charts_dir = PathBuf::from("/var/lib/leasing/charts");

        let config = LeasingConfig::try_from(args).expect("config should parse");

        assert_eq!(
            config.registry_config().charts_dir,
            PathBuf::from("/var/lib/leasing/charts")
        );
    }

    #[test]
    fn sse_is_an_alias_for_http() {
        assert_eq!(Transport::from_str("sse", true), Ok(Transport::Http));
        assert_eq!(Transport::from_str("HTTP", true), Ok(Transport::Http));
    }
}
