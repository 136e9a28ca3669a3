//! The `config` subcommand.

use geoconnect_common::{db::redact_url, prelude::*, serde_json};
use structopt::StructOpt;

/// Configuration commands.
#[derive(Debug, StructOpt)]
pub enum Opt {
    /// Print our settings as JSON, with secrets hidden.
    #[structopt(name = "show")]
    Show,
}

/// Run the `config` subcommand.
pub fn run(settings: &Settings, opt: &Opt) -> Result<()> {
    match opt {
        Opt::Show => {
            println!("{}", serde_json::to_string_pretty(&shown_settings(settings)?)?);
            Ok(())
        }
    }
}

fn shown_settings(settings: &Settings) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(settings).context("could not serialize settings")?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "database_url".to_owned(),
            redact_url(&settings.database_url).into(),
        );
    }
    Ok(value)
}

#[test]
fn secrets_are_hidden() {
    let settings = Settings::from_lookup(|key| {
        let value = match key {
            "DATABASE_URL" => "postgres://geo:hunter2@db/geoconnect",
            "DATAVERSE_SERVER_URL" => "https://dataverse.example.edu",
            "WORLDMAP_SERVER_URL" => "https://worldmap.example.edu",
            "WORLDMAP_ACCOUNT_PASSWORD" => "hunter3",
            "WORLDMAP_SIGNATURE_KEY" => "hunter4",
            "GEOCONNECT_ADMIN_PASSWORD" => "hunter5",
            _ => return None,
        };
        Some(value.to_owned())
    })
    .unwrap();
    let shown = shown_settings(&settings).unwrap();
    let text = shown.to_string();
    for secret in &["hunter2", "hunter3", "hunter4", "hunter5"] {
        assert!(!text.contains(secret), "{} leaked in {}", secret, text);
    }
    assert_eq!(shown["database_url"], "postgres://geo:********@db/geoconnect");
    assert_eq!(shown["http_timeout"], "4m");
}
