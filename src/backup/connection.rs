// mongo-s3-backup/src/backup/connection.rs
use percent_encoding::percent_decode_str;
use url::Url;

use crate::config::{ConnectionSpec, DatabaseInput};
use crate::errors::{BackupError, Result};

pub const DEFAULT_SCHEME: &str = "mongodb";
pub const SRV_SCHEME: &str = "mongodb+srv";
pub const DEFAULT_PORT: u16 = 27017;

/// Connection parameters after both input shapes have been normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalConnection {
    pub scheme: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: String,
    pub ssl: Option<bool>,
    pub authentication_database: Option<String>,
    /// Always at least one entry. Only the first one is dumped from.
    pub hosts: Vec<(String, u16)>,
}

impl CanonicalConnection {
    pub fn primary_host(&self) -> Option<(&str, u16)> {
        self.hosts.first().map(|(host, port)| (host.as_str(), *port))
    }
}

pub fn resolve(input: &DatabaseInput) -> Result<CanonicalConnection> {
    match input {
        DatabaseInput::Uri(uri) => from_uri(uri),
        DatabaseInput::Spec(spec) => Ok(from_spec(spec)),
    }
}

fn from_spec(spec: &ConnectionSpec) -> CanonicalConnection {
    CanonicalConnection {
        scheme: DEFAULT_SCHEME.to_string(),
        username: non_empty(spec.username.as_deref()),
        password: non_empty(spec.password.as_deref()),
        database: spec.database.clone().unwrap_or_default(),
        ssl: spec.ssl,
        authentication_database: spec.authentication_database.clone(),
        hosts: vec![(
            spec.host.clone().unwrap_or_default(),
            spec.port.unwrap_or(DEFAULT_PORT),
        )],
    }
}

/// Parses `mongodb://[user[:pass]@]host[:port][,host[:port]...]/database[?options]`.
///
/// The `url` crate only understands a single authority, so the host list is
/// split off first and each host is parsed on its own.
fn from_uri(uri: &str) -> Result<CanonicalConnection> {
    let (scheme, rest) = uri
        .split_once("://")
        .ok_or_else(|| parse_error("connection string has no scheme"))?;
    if scheme != DEFAULT_SCHEME && scheme != SRV_SCHEME {
        return Err(parse_error(&format!("unsupported scheme '{}'", scheme)));
    }

    let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);
    let (userinfo, host_list) = match authority.rsplit_once('@') {
        Some((userinfo, hosts)) => (Some(userinfo), hosts),
        None => (None, authority),
    };

    let hosts = host_list
        .split(',')
        .map(|host| parse_host(scheme, host))
        .collect::<Result<Vec<_>>>()?;

    let (username, password) = match userinfo {
        Some(info) => match info.split_once(':') {
            Some((user, pass)) => (decode(user)?, decode(pass)?),
            None => (decode(info)?, None),
        },
        None => (None, None),
    };

    // Only the path and query matter here; the first host stands in for the
    // authority so the rest of the string goes through the standard parser.
    let first_host = host_list.split(',').next().unwrap_or_default();
    let parsed = Url::parse(&format!("{}://{}{}", scheme, first_host, tail))?;

    let database = decode(parsed.path().trim_start_matches('/'))?
        .ok_or_else(|| parse_error("connection string does not name a database"))?;

    let mut ssl = None;
    let mut authentication_database = None;
    for (key, value) in parsed.query_pairs() {
        match &*key {
            "ssl" | "tls" => ssl = Some(parse_flag(&key, &value)?),
            "authSource" => authentication_database = non_empty(Some(&*value)),
            _ => {}
        }
    }
    if scheme == SRV_SCHEME && ssl.is_none() {
        // SRV connections default to TLS.
        ssl = Some(true);
    }

    Ok(CanonicalConnection {
        scheme: scheme.to_string(),
        username,
        password,
        database,
        ssl,
        authentication_database,
        hosts,
    })
}

fn parse_host(scheme: &str, host: &str) -> Result<(String, u16)> {
    if host.is_empty() {
        return Err(parse_error("connection string has an empty host"));
    }
    let parsed = Url::parse(&format!("{}://{}", scheme, host))?;
    let name = parsed
        .host_str()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| parse_error(&format!("invalid host '{}'", host)))?;
    Ok((name.to_string(), parsed.port().unwrap_or(DEFAULT_PORT)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(parse_error(&format!(
            "option '{}' expects true or false, got '{}'",
            key, other
        ))),
    }
}

fn decode(raw: &str) -> Result<Option<String>> {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|e| parse_error(&format!("invalid percent-encoding: {}", e)))?;
    Ok(non_empty(Some(&*decoded)))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

fn parse_error(reason: &str) -> BackupError {
    BackupError::ConnectionParse(reason.to_string())
}
