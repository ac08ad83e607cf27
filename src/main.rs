#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod document;
mod env;
mod error;
mod store;
mod telemetry;
mod validation;
#[cfg(test)]
mod test;

use api::{
    api_add_faculty, api_add_student, api_get_faculty, api_get_students, api_get_themes, api_login,
    api_logout, api_me, api_me_unauthorized, api_register_user, api_set_theme, api_update_user,
    health,
};
use auth::{forbidden_api, unauthorized_api};
use rocket::{Build, Rocket, tokio};
use store::{Store, clean_expired_sessions};
use telemetry::TelemetryFairing;
use telemetry::init_tracing;
use tracing::{error, info, warn};

#[launch]
async fn rocket() -> _ {
    init_tracing();

    if let Err(e) = env::load_environment() {
        warn!("Could not load environment files: {}", e);
    }

    let snapshot_path =
        std::env::var("PORTAL_SNAPSHOT_PATH").unwrap_or_else(|_| "data.json".to_string());
    let cache_path =
        std::env::var("PORTAL_CACHE_PATH").unwrap_or_else(|_| "appData.json".to_string());

    let store = Store::new(snapshot_path, cache_path);

    info!("Priming document store...");
    match store::load_document(&store).await {
        Ok(document) => info!(
            users = document.users.len(),
            themes = document.themes.len(),
            "Document store ready"
        ),
        Err(e) => {
            error!("Failed to load document store: {}", e);
            panic!("Document store initialization failed: {}", e);
        }
    }

    let store_clone = store.clone();

    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&store_clone).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(3600)).await;
        }
    });

    init_rocket(store).await
}

pub async fn init_rocket(store: Store) -> Rocket<Build> {
    info!("Starting campus portal");

    rocket::build()
        .manage(store)
        .mount(
            "/api",
            routes![
                api_login,
                api_logout,
                api_me,
                api_me_unauthorized,
                api_get_themes,
                api_set_theme,
                api_add_student,
                api_get_students,
                api_add_faculty,
                api_get_faculty,
                api_register_user,
                api_update_user,
            ],
        )
        .register("/api", catchers![unauthorized_api, forbidden_api])
        .mount("/api", routes![health])
        .attach(TelemetryFairing)
}
