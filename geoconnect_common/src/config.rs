//! Runtime configuration, read from environment variables.

use std::{env, time::Duration};
use url::Url;

use crate::prelude::*;

/// Default time limit for calls to WorldMap and Dataverse.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(240);

/// How long we keep a file before the cleanup job deletes it.
const DEFAULT_FILE_RETENTION: Duration = Duration::from_secs(3 * 24 * 60 * 60);

/// How often the server runs the cleanup job.
const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Settings shared by `geoconnectd` and the `geoconnect` CLI.
#[derive(Clone, Debug, Serialize)]
pub struct Settings {
    /// PostgreSQL connection URL.
    #[serde(skip_serializing)]
    pub database_url: String,
    /// Enables the test-only admin routes.
    pub debug: bool,
    /// Where we keep our copies of uploaded files.
    pub media_root: PathBuf,
    /// Parent directory for per-file scratch directories.
    pub scratch_directory: PathBuf,
    /// The Dataverse installation we report back to.
    pub dataverse_server_url: Url,
    /// The WorldMap installation which hosts our layers.
    pub worldmap_server_url: Url,
    /// Account used for the WorldMap datatables API.
    pub worldmap_username: String,
    /// Password for `worldmap_username`.
    #[serde(serialize_with = "redacted")]
    pub worldmap_password: String,
    /// Shared secret used to sign requests to WorldMap.
    #[serde(serialize_with = "redacted")]
    pub worldmap_signature_key: String,
    /// Password for the admin routes, if configured.
    #[serde(serialize_with = "redacted_option")]
    pub admin_password: Option<String>,
    /// Time limit for each outgoing HTTP request.
    #[serde(with = "humantime_serde")]
    pub http_timeout: Duration,
    /// Files older than this are removed by the cleanup job.
    #[serde(with = "humantime_serde")]
    pub file_retention: Duration,
    /// How often `geoconnectd` runs the cleanup job.
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

impl Settings {
    /// Load our settings from the process environment.
    pub fn from_env() -> Result<Settings> {
        Settings::from_lookup(|key| env::var(key).ok())
    }

    /// Load our settings using `lookup` to fetch each variable. Empty values
    /// are treated as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Settings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| format_err!("missing environment variable {}", key))
        };
        let url = |key: &str| -> Result<Url> {
            let value = required(key)?;
            Url::parse(&value)
                .with_context(|| format!("could not parse {} as a URL: {:?}", key, value))
        };
        let duration = |key: &str, default: Duration| -> Result<Duration> {
            match get(key) {
                Some(value) => humantime_serde::re::humantime::parse_duration(&value)
                    .with_context(|| {
                        format!("could not parse {} as a duration: {:?}", key, value)
                    }),
                None => Ok(default),
            }
        };

        let debug = match get("GEOCONNECT_DEBUG") {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                format_err!("GEOCONNECT_DEBUG should be true or false, not {:?}", value)
            })?,
            None => false,
        };

        Ok(Settings {
            database_url: required("DATABASE_URL")?,
            debug,
            media_root: get("GEOCONNECT_MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("media")),
            scratch_directory: get("GEOCONNECT_SCRATCH_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or_else(|| env::temp_dir().join("geoconnect")),
            dataverse_server_url: url("DATAVERSE_SERVER_URL")?,
            worldmap_server_url: url("WORLDMAP_SERVER_URL")?,
            worldmap_username: get("WORLDMAP_ACCOUNT_USERNAME").unwrap_or_default(),
            worldmap_password: get("WORLDMAP_ACCOUNT_PASSWORD").unwrap_or_default(),
            worldmap_signature_key: required("WORLDMAP_SIGNATURE_KEY")?,
            admin_password: get("GEOCONNECT_ADMIN_PASSWORD"),
            http_timeout: duration("GEOCONNECT_HTTP_TIMEOUT", DEFAULT_HTTP_TIMEOUT)?,
            file_retention: duration("GEOCONNECT_FILE_RETENTION", DEFAULT_FILE_RETENTION)?,
            cleanup_interval: duration(
                "GEOCONNECT_CLEANUP_INTERVAL",
                DEFAULT_CLEANUP_INTERVAL,
            )?,
        })
    }

    /// The admin password, which the server refuses to start without.
    pub fn required_admin_password(&self) -> Result<&str> {
        self.admin_password
            .as_deref()
            .ok_or_else(|| format_err!("missing environment variable GEOCONNECT_ADMIN_PASSWORD"))
    }
}

/// Parse the usual spellings of a boolean flag.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn redacted<S: serde::Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_empty() {
        serializer.serialize_str("")
    } else {
        serializer.serialize_str("********")
    }
}

fn redacted_option<S: serde::Serializer>(
    value: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => redacted(value, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| vars.get(key).cloned()
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://postgres@localhost/geoconnect"),
        ("DATAVERSE_SERVER_URL", "https://dataverse.example.edu"),
        ("WORLDMAP_SERVER_URL", "https://worldmap.example.edu"),
        ("WORLDMAP_SIGNATURE_KEY", "s3cret"),
    ];

    #[test]
    fn minimal_settings_use_defaults() {
        let settings = Settings::from_lookup(lookup_from(MINIMAL)).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.media_root, PathBuf::from("media"));
        assert_eq!(settings.http_timeout, Duration::from_secs(240));
        assert_eq!(settings.file_retention, Duration::from_secs(3 * 86400));
        assert_eq!(settings.worldmap_server_url.as_str(), "https://worldmap.example.edu/");
        assert!(settings.admin_password.is_none());
        assert!(settings.required_admin_password().is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("GEOCONNECT_DEBUG", "yes"));
        vars.push(("GEOCONNECT_HTTP_TIMEOUT", "30s"));
        vars.push(("GEOCONNECT_FILE_RETENTION", "2days"));
        vars.push(("GEOCONNECT_ADMIN_PASSWORD", "hunter2"));
        let settings = Settings::from_lookup(lookup_from(&vars)).unwrap();
        assert!(settings.debug);
        assert_eq!(settings.http_timeout, Duration::from_secs(30));
        assert_eq!(settings.file_retention, Duration::from_secs(2 * 86400));
        assert_eq!(settings.required_admin_password().unwrap(), "hunter2");
    }

    #[test]
    fn bad_values_name_the_variable() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("GEOCONNECT_HTTP_TIMEOUT", "soon"));
        let err = Settings::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(err.to_string().contains("GEOCONNECT_HTTP_TIMEOUT"));

        let err = Settings::from_lookup(lookup_from(&MINIMAL[1..])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn secrets_are_not_serialized() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("WORLDMAP_ACCOUNT_PASSWORD", "pw"));
        let settings = Settings::from_lookup(lookup_from(&vars)).unwrap();
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("s3cret"));
        assert!(!json.contains("postgres://"));
        assert!(json.contains("********"));
        assert!(json.contains("\"http_timeout\":\"4m\""));
    }
}
