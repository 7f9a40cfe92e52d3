//! HTTP API and browser UI for the clinic record store.
//!
//! Routes:
//!
//! | Method | Path                     | Handler                         |
//! |--------|--------------------------|---------------------------------|
//! | GET    | `/`                      | bundled UI                      |
//! | GET    | `/health`                | liveness                        |
//! | POST   | `/patients`              | create patient                  |
//! | GET    | `/patients`              | list patients                   |
//! | GET    | `/patients/search?q=`    | name substring search           |
//! | GET    | `/patients/:id`          | get patient                     |
//! | PUT    | `/patients/:id`          | update patient                  |
//! | DELETE | `/patients/:id`          | delete patient and visits       |
//! | POST   | `/patients/:id/visits`   | add visit                       |
//! | GET    | `/patients/:id/visits`   | list visits, newest first       |
//! | GET    | `/visits/:id`            | get visit                       |
//! | PUT    | `/visits/:id`            | update visit                    |
//! | DELETE | `/visits/:id`            | delete visit                    |
//! | GET    | `/visits/:id/print`      | medical certificate download    |

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;

use std::sync::Arc;

use axum::{routing::get, Router};
use clinic_core::{
    CertificateFiller, CertificateTemplate, Clinic, ClinicResult, Database, ExportMirror, RunStyle,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ClinicConfig;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub clinic: Arc<Clinic>,
}

impl AppState {
    pub fn new(clinic: Clinic) -> Self {
        Self {
            clinic: Arc::new(clinic),
        }
    }
}

/// Open the store, load the certificate template and register the export mirror.
pub fn build_clinic(config: &ClinicConfig) -> ClinicResult<Clinic> {
    let db = Database::open(&config.storage.database_path)?;
    tracing::info!(path = %config.storage.database_path.display(), "database opened");

    let template = match &config.certificate.template_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading certificate template");
            CertificateTemplate::load(path)?
        }
        None => CertificateTemplate::builtin()?,
    };
    let style = RunStyle {
        font_family: config.certificate.font_family.clone(),
        font_size_pt: config.certificate.font_size_pt,
    };

    let mut clinic = Clinic::new(db, CertificateFiller::new(template, style));
    if config.export.enabled {
        tracing::info!(path = %config.export.path.display(), "export mirror enabled");
        clinic = clinic.with_observer(Arc::new(ExportMirror::new(&config.export.path)));
        clinic.sync_observers()?;
    }

    Ok(clinic)
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route(
            "/patients",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route("/patients/search", get(handlers::search_patients))
        .route(
            "/patients/:id",
            get(handlers::get_patient)
                .put(handlers::update_patient)
                .delete(handlers::delete_patient),
        )
        .route(
            "/patients/:id/visits",
            get(handlers::list_visits).post(handlers::add_visit),
        )
        .route(
            "/visits/:id",
            get(handlers::get_visit)
                .put(handlers::update_visit)
                .delete(handlers::delete_visit),
        )
        .route("/visits/:id/print", get(handlers::print_certificate))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
