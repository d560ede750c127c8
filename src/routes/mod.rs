// Route exports
pub mod dialog;

use actix_web::web;

pub use dialog::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(dialog::configure),
    );
}
