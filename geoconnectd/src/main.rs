//! The GeoConnect web server.

// Include all of Rocket's macros.
#[macro_use]
extern crate rocket;

use geoconnect_common::{
    cast,
    db::{self, ConnectVia},
    geoconnect_common_version,
    prelude::*,
    quick_main,
    services::Remotes,
    tracing_support::initialize_tracing,
};
use rocket::{
    data::{Limits, ToByteUnit},
    response::content::RawHtml,
    Build, Rocket, State,
};
use std::sync::Arc;

mod admin;
mod janitor;
mod maps;
mod shapefiles;
mod tabular;
mod uploads;
mod util;
mod views;

use util::{AdminPassword, DbConn, DbPool, GeoconnectdResult, Services, SharedServices};

/// Return our `geoconnect_common` version.
#[get("/version")]
fn version() -> String {
    geoconnect_common_version().to_string()
}

/// List uploaded files, with forms for uploading more.
#[get("/")]
async fn index(state: &State<SharedServices>, db: DbConn) -> GeoconnectdResult<RawHtml<String>> {
    let debug = state.settings.debug;
    let html = db
        .run(move |conn| {
            let files = GisDataFile::list(None, conn)?;
            Ok(views::index_page(files, None, debug)?)
        })
        .await?;
    Ok(RawHtml(html))
}

/// Build our server. Split out from `run` so tests can use it.
fn build_rocket(
    figment: rocket::figment::Figment,
    services: SharedServices,
    pool: db::Pool,
    admin_password: String,
) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(services)
        .manage(DbPool(pool))
        .manage(AdminPassword(admin_password))
        .mount(
            "/",
            routes![
                version,
                index,
                shapefiles::upload_shapefile,
                shapefiles::view_shapefile,
                shapefiles::view_shapefile_first_time,
                shapefiles::view_shapefile_visualize_attempt,
                shapefiles::visualize,
                shapefiles::classify,
                tabular::upload_tabular,
                tabular::view_tabular,
                tabular::map_lat_lng,
                tabular::map_table_join,
                tabular::join_targets,
                maps::delete_map,
                admin::delete_files,
                admin::delete_import_attempts,
            ],
        )
}

/// Rocket settings, with upload limits large enough for real shapefiles.
fn figment() -> rocket::figment::Figment {
    let limits = Limits::default()
        .limit("file", 1.gibibytes())
        .limit("data-form", 1.gibibytes());
    rocket::Config::figment().merge(("limits", limits))
}

fn run() -> Result<()> {
    openssl_probe::init_ssl_cert_env_vars();
    initialize_tracing();

    let settings = Settings::from_env()?;
    let admin_password = settings.required_admin_password()?.to_owned();
    let figment = figment();
    let config: rocket::Config = figment
        .extract()
        .context("could not read Rocket configuration")?;
    let pool = db::pool(
        &settings,
        cast::u32(config.workers).context("too many Rocket workers")?,
        ConnectVia::Server,
    )?;
    let remotes = Remotes::from_settings(&settings)?;
    let services = Arc::new(Services { settings, remotes });

    janitor::start_janitor(services.clone(), pool.clone())?;

    let rocket = build_rocket(figment, services, pool, admin_password);
    rocket::execute(rocket.launch()).map_err(|err| format_err!("server failed: {}", err))?;
    Ok(())
}

quick_main!(run);

#[cfg(test)]
mod tests {
    use super::*;
    use geoconnect_common::diesel::r2d2::ConnectionManager;
    use rocket::{
        http::{Header, Status},
        local::blocking::Client,
    };

    fn client(debug: bool) -> Client {
        let settings = Settings::from_lookup(|key| {
            let value = match key {
                "DATABASE_URL" => "postgres://localhost/geoconnect_unused",
                "DATAVERSE_SERVER_URL" => "http://127.0.0.1:1",
                "WORLDMAP_SERVER_URL" => "http://127.0.0.1:1",
                "WORLDMAP_SIGNATURE_KEY" => "key",
                "GEOCONNECT_DEBUG" if debug => "true",
                _ => return None,
            };
            Some(value.to_owned())
        })
        .unwrap();
        let remotes = Remotes::from_settings(&settings).unwrap();
        // Never connects unless a handler asks for a connection.
        let pool = db::Pool::builder()
            .build_unchecked(ConnectionManager::new(settings.database_url.clone()));
        let services = Arc::new(Services { settings, remotes });
        Client::tracked(build_rocket(figment(), services, pool, "sesame".to_owned())).unwrap()
    }

    fn admin_auth() -> Header<'static> {
        // "admin:sesame"
        Header::new("Authorization", "Basic YWRtaW46c2VzYW1l")
    }

    #[test]
    fn version_matches_common() {
        let client = client(false);
        let resp = client.get("/version").dispatch();
        assert_eq!(resp.status(), Status::Ok);
        assert_eq!(
            resp.into_string().unwrap(),
            geoconnect_common_version().to_string()
        );
    }

    #[test]
    fn admin_routes_need_password() {
        let client = client(false);
        let resp = client.post("/admin/delete-files").dispatch();
        assert_eq!(resp.status(), Status::Unauthorized);
        let resp = client
            .post("/admin/delete-files")
            .header(Header::new("Authorization", "Basic YWRtaW46d3Jvbmc="))
            .dispatch();
        assert_eq!(resp.status(), Status::Unauthorized);
    }

    #[test]
    fn admin_routes_are_only_for_testing() {
        let client = client(false);
        for path in &["/admin/delete-files", "/admin/delete-import-attempts"] {
            let resp = client.post(*path).header(admin_auth()).dispatch();
            assert_eq!(resp.status(), Status::Ok);
            assert_eq!(resp.into_string().unwrap(), admin::ONLY_FOR_TESTING);
        }
    }
}
