use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use configuration::ConfigStore;
use log::LevelFilter;
use sqlx::ConnectOptions;
use sqlx::any::AnyConnectOptions;
use url::Url;

use crate::error::DbError;

/// TLS toggle for assembled connections, from the boolean `database.sslmode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMode {
    Enable,
    Disable,
}

impl SslMode {
    pub fn from_flag(enabled: bool) -> Self {
        if enabled { SslMode::Enable } else { SslMode::Disable }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SslMode::Enable => "enable",
            SslMode::Disable => "disable",
        }
    }

    /// The mode name the Postgres driver understands.
    fn driver_mode(self) -> &'static str {
        match self {
            SslMode::Enable => "require",
            SslMode::Disable => "disable",
        }
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection parameters assembled from individual config keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionFields {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl: SslMode,
}

/// How to reach the database.
///
/// Derived from the config store on demand, never stored there. A non-empty
/// `database.dsn` wins over the individual fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionDescriptor {
    /// Used verbatim as the driver URL.
    Dsn(String),
    Fields(ConnectionFields),
}

impl ConnectionDescriptor {
    /// Reads the `database.*` keys.
    ///
    /// Fails without touching the network if host, user or name is empty, or
    /// the port is zero or out of range. The derivation is pure, so repeated
    /// calls on the same config give the same result.
    pub fn from_config(config: &ConfigStore) -> Result<Self, DbError> {
        let dsn = config.get_string("database.dsn");
        if !dsn.is_empty() {
            return Ok(ConnectionDescriptor::Dsn(dsn));
        }

        let host = config.get_string("database.host");
        let port = config.get_int("database.port");
        let user = config.get_string("database.user");
        let password = config.get_string("database.password");
        let name = config.get_string("database.name");
        let ssl = SslMode::from_flag(config.get_bool("database.sslmode"));

        let valid_port = u16::try_from(port).ok().filter(|port| *port != 0);
        let Some(port_number) = valid_port.filter(|_| !host.is_empty() && !user.is_empty() && !name.is_empty()) else {
            return Err(DbError::IncompleteConfig(format!(
                "host={host:?} user={user:?} name={name:?} port={port}"
            )));
        };

        Ok(ConnectionDescriptor::Fields(ConnectionFields {
            host,
            port: port_number,
            user,
            password,
            name,
            ssl,
        }))
    }

    /// The descriptor with the password masked, for logs.
    pub fn redacted(&self) -> String {
        match self {
            ConnectionDescriptor::Dsn(dsn) => match Url::parse(dsn) {
                Ok(mut url) if url.password().is_some() => match url.set_password(Some("***")) {
                    Ok(()) => url.to_string(),
                    Err(()) => mask_keyword_password(dsn),
                },
                _ => mask_keyword_password(dsn),
            },
            ConnectionDescriptor::Fields(fields) => render_fields(fields, "***"),
        }
    }

    /// Driver options for this descriptor.
    ///
    /// A DSN is either a driver URL or libpq-style `key=value` pairs; the
    /// latter are turned into a `postgres://` URL. `debug` raises statement logging from `Debug` (the driver's default)
    /// to `Info`.
    pub fn connect_options(&self, debug: bool) -> Result<AnyConnectOptions, DbError> {
        let options = match self {
            ConnectionDescriptor::Dsn(dsn) if !dsn.contains("://") => {
                let url = keyword_url(dsn)?;
                AnyConnectOptions::from_url(&url)
                    .map_err(|e| DbError::InvalidDsn(format!("{}: {e}", self.redacted())))?
            }
            ConnectionDescriptor::Dsn(dsn) => AnyConnectOptions::from_str(dsn)
                .map_err(|e| DbError::InvalidDsn(format!("{}: {e}", self.redacted())))?,
            ConnectionDescriptor::Fields(fields) => {
                let url = driver_url(fields)?;
                AnyConnectOptions::from_url(&url)
                    .map_err(|e| DbError::InvalidDsn(format!("{}: {e}", self.redacted())))?
            }
        };

        let level = if debug { LevelFilter::Info } else { LevelFilter::Debug };
        Ok(options.log_statements(level))
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionDescriptor::Dsn(dsn) => f.write_str(dsn),
            ConnectionDescriptor::Fields(fields) => f.write_str(&render_fields(fields, &fields.password)),
        }
    }
}

fn render_fields(fields: &ConnectionFields, password: &str) -> String {
    format!(
        "host={} port={} user={} password={} dbname={} sslmode={}",
        fields.host, fields.port, fields.user, password, fields.name, fields.ssl
    )
}

fn mask_keyword_password(dsn: &str) -> String {
    dsn.split_whitespace()
        .map(|pair| {
            if pair.starts_with("password=") {
                "password=***"
            } else {
                pair
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn driver_url(fields: &ConnectionFields) -> Result<Url, DbError> {
    let mut url = base_url(fields)?;
    url.query_pairs_mut()
        .append_pair("sslmode", fields.ssl.driver_mode());
    Ok(url)
}

fn base_url(fields: &ConnectionFields) -> Result<Url, DbError> {
    let invalid = |what: &str| DbError::InvalidDsn(format!("cannot use {what} in a connection URL"));

    let mut url = Url::parse("postgres://localhost").map_err(|e| DbError::InvalidDsn(e.to_string()))?;
    url.set_host(Some(&fields.host))
        .map_err(|e| DbError::InvalidDsn(format!("host {:?}: {e}", fields.host)))?;
    url.set_port(Some(fields.port)).map_err(|()| invalid("port"))?;
    if !fields.user.is_empty() {
        url.set_username(&fields.user).map_err(|()| invalid("user"))?;
    }
    if !fields.password.is_empty() {
        url.set_password(Some(&fields.password))
            .map_err(|()| invalid("password"))?;
    }
    url.set_path(&fields.name);
    Ok(url)
}

/// Converts a libpq keyword DSN (`host=db port=5432 dbname=app ...`) into a
/// driver URL. Unset host and port fall back to libpq's defaults; keys other
/// than the connection fields are passed on as URL parameters. Quoted values
/// are not supported.
fn keyword_url(dsn: &str) -> Result<Url, DbError> {
    let mut fields = ConnectionFields {
        host: "localhost".to_string(),
        port: 5432,
        user: String::new(),
        password: String::new(),
        name: String::new(),
        ssl: SslMode::Disable,
    };
    let mut sslmode = None;
    let mut extra = Vec::new();

    for pair in dsn.split_whitespace() {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(DbError::InvalidDsn(format!("expected key=value, got {pair:?}")));
        };
        match key {
            "host" => fields.host = value.to_string(),
            "port" => {
                fields.port = value
                    .parse()
                    .map_err(|_| DbError::InvalidDsn(format!("port {value:?} is not a valid port")))?;
            }
            "user" => fields.user = value.to_string(),
            "password" => fields.password = value.to_string(),
            "dbname" => fields.name = value.to_string(),
            "sslmode" => sslmode = Some(value),
            _ => extra.push((key, value)),
        }
    }

    let mut url = base_url(&fields)?;
    {
        let mut query = url.query_pairs_mut();
        if let Some(mode) = sslmode {
            let mode = match mode {
                "enable" => SslMode::Enable.driver_mode(),
                other => other,
            };
            query.append_pair("sslmode", mode);
        }
        for (key, value) in extra {
            query.append_pair(key, value);
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }
    Ok(url)
}

/// Pool knobs exposed by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

impl PoolSettings {
    /// Reads `database.maxConnections` and `database.acquireTimeout`
    /// (seconds); unset or non-positive values keep the defaults.
    pub fn from_config(config: &ConfigStore) -> Self {
        let mut settings = Self::default();
        if let Ok(max) = u32::try_from(config.get_int("database.maxConnections")) {
            if max > 0 {
                settings.max_connections = max;
            }
        }
        if let Ok(secs) = u64::try_from(config.get_int("database.acquireTimeout")) {
            if secs > 0 {
                settings.acquire_timeout = Duration::from_secs(secs);
            }
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::{Value, json};
    use tempfile::TempDir;

    use super::*;

    fn config(database: Value) -> (TempDir, ConfigStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, json!({ "database": database }).to_string()).unwrap();
        let store = ConfigStore::load(&path).unwrap();
        (dir, store)
    }

    fn complete(sslmode: bool) -> Value {
        json!({
            "host": "db.internal",
            "port": 5432,
            "user": "app",
            "password": "s3cret",
            "name": "nodelab",
            "sslmode": sslmode
        })
    }

    #[test]
    fn assembles_fields_with_ssl_enabled_or_disabled() {
        for (flag, mode) in [(true, "sslmode=enable"), (false, "sslmode=disable")] {
            let (_dir, store) = config(complete(flag));
            let descriptor = ConnectionDescriptor::from_config(&store).unwrap();

            assert_eq!(
                descriptor.to_string(),
                format!("host=db.internal port=5432 user=app password=s3cret dbname=nodelab {mode}")
            );
        }
    }

    #[test]
    fn dsn_is_passed_through_verbatim() {
        let mut database = complete(true);
        database["dsn"] = json!("postgres://other:pw@elsewhere:6543/db?sslmode=disable");
        let (_dir, store) = config(database);

        let descriptor = ConnectionDescriptor::from_config(&store).unwrap();

        assert_eq!(
            descriptor,
            ConnectionDescriptor::Dsn("postgres://other:pw@elsewhere:6543/db?sslmode=disable".into())
        );
        assert_eq!(
            descriptor.to_string(),
            "postgres://other:pw@elsewhere:6543/db?sslmode=disable"
        );
    }

    #[test]
    fn missing_required_fields_fail_every_time() {
        let cases = [
            ("host", json!("")),
            ("user", json!("")),
            ("name", json!("")),
            ("port", json!(0)),
            ("port", json!(70000)),
        ];
        for (key, value) in cases {
            let mut database = complete(false);
            database[key] = value;
            let (_dir, store) = config(database);

            let first = ConnectionDescriptor::from_config(&store).unwrap_err();
            let second = ConnectionDescriptor::from_config(&store).unwrap_err();

            assert!(matches!(first, DbError::IncompleteConfig(_)), "{key}: {first}");
            assert_eq!(first.to_string(), second.to_string());
        }
    }

    #[test]
    fn empty_section_is_incomplete() {
        let (_dir, store) = config(json!({}));
        let err = ConnectionDescriptor::from_config(&store).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Incomplete database config: host=\"\" user=\"\" name=\"\" port=0"
        );
    }

    #[test]
    fn redacted_hides_passwords() {
        let (_dir, store) = config(complete(true));
        let descriptor = ConnectionDescriptor::from_config(&store).unwrap();
        assert!(descriptor.redacted().contains("password=***"));
        assert!(!descriptor.redacted().contains("s3cret"));

        let url = ConnectionDescriptor::Dsn("postgres://app:s3cret@db:5432/x".into());
        assert_eq!(url.redacted(), "postgres://app:***@db:5432/x");

        let keywords = ConnectionDescriptor::Dsn("host=db password=s3cret dbname=x".into());
        assert_eq!(keywords.redacted(), "host=db password=*** dbname=x");
    }

    #[test]
    fn driver_url_encodes_credentials_and_maps_ssl() {
        let fields = ConnectionFields {
            host: "db.internal".into(),
            port: 5432,
            user: "app user".into(),
            password: "p@ss/word".into(),
            name: "nodelab".into(),
            ssl: SslMode::Enable,
        };
        let url = driver_url(&fields).unwrap();

        assert_eq!(url.scheme(), "postgres");
        assert_eq!(url.host_str(), Some("db.internal"));
        assert_eq!(url.port(), Some(5432));
        assert_eq!(url.username(), "app%20user");
        assert_eq!(url.password(), Some("p%40ss%2Fword"));
        assert_eq!(url.path(), "/nodelab");
        assert_eq!(url.query(), Some("sslmode=require"));

        let plain = ConnectionFields { ssl: SslMode::Disable, ..fields };
        assert_eq!(driver_url(&plain).unwrap().query(), Some("sslmode=disable"));
    }

    #[test]
    fn keyword_dsn_becomes_a_driver_url() {
        let url = keyword_url(
            "host=localhost port=5432 user=app password=pw dbname=nodelab sslmode=disable",
        )
        .unwrap();
        assert_eq!(url.as_str(), "postgres://app:pw@localhost:5432/nodelab?sslmode=disable");

        let enabled = keyword_url("host=db dbname=nodelab sslmode=enable application_name=nodelab").unwrap();
        assert_eq!(
            enabled.as_str(),
            "postgres://db:5432/nodelab?sslmode=require&application_name=nodelab"
        );

        let bare = keyword_url("dbname=nodelab").unwrap();
        assert_eq!(bare.as_str(), "postgres://localhost:5432/nodelab");
    }

    #[test]
    fn malformed_keyword_dsn_is_rejected() {
        assert!(matches!(keyword_url("host=db port=huge"), Err(DbError::InvalidDsn(_))));
        assert!(matches!(keyword_url("host=db dbname"), Err(DbError::InvalidDsn(_))));
    }

    #[test]
    fn rendered_descriptor_is_accepted_as_a_dsn() {
        let (_dir, store) = config(complete(true));
        let rendered = ConnectionDescriptor::from_config(&store).unwrap().to_string();
        let (_dir, store) = config(json!({ "dsn": rendered }));

        let descriptor = ConnectionDescriptor::from_config(&store).unwrap();

        assert!(descriptor.connect_options(false).is_ok());
    }

    #[test]
    fn pool_settings_default_and_override() {
        let (_dir, store) = config(json!({}));
        assert_eq!(PoolSettings::from_config(&store), PoolSettings::default());

        let (_dir, store) = config(json!({ "maxConnections": 2, "acquireTimeout": 30 }));
        let settings = PoolSettings::from_config(&store);
        assert_eq!(settings.max_connections, 2);
        assert_eq!(settings.acquire_timeout, Duration::from_secs(30));
    }
}
