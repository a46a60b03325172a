use crate::{
    api::{company, document, employee, payment, wizard},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            (60_000 / requests_per_min as u64).max(1)
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min.max(1))
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap_or_default();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let wizard_limiter = Arc::new(build_limiter(config.rate_wizard_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/setup")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::setup)),
            ),
    );

    // Document wizard, open to anyone holding the session cookie
    cfg.service(
        web::scope("/wizard")
            .wrap(wizard_limiter)
            .service(
                web::resource("")
                    .route(web::post().to(wizard::submit))
                    .route(web::delete().to(wizard::abandon)),
            )
            .service(web::resource("/preview").route(web::get().to(wizard::preview)))
            .service(web::resource("/preview/{doc_type}").route(web::get().to(wizard::preview_part)))
            .service(web::resource("/bundle").route(web::get().to(wizard::bundle)))
            .service(web::resource("/bundle/{doc_type}").route(web::get().to(wizard::bundle_part)))
            .service(web::resource("/generate").route(web::post().to(wizard::generate)))
            .service(
                web::resource("/generate/{doc_type}").route(web::post().to(wizard::generate_part)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    .service(
                        web::resource("/{id}/status").route(web::put().to(employee::set_status)),
                    )
                    .service(
                        web::resource("/{id}/documents")
                            .route(web::get().to(document::list_documents)),
                    )
                    // /employees/{id}/documents/{doc_type}
                    .service(
                        web::resource("/{id}/documents/{doc_type}")
                            .route(web::post().to(document::start_document)),
                    ),
            )
            .service(
                web::resource("/documents/{id}/download").route(web::get().to(document::download)),
            )
            .service(
                web::scope("/payments")
                    .service(web::resource("").route(web::get().to(payment::list_payments)))
                    .service(web::resource("/{id}/paid").route(web::put().to(payment::mark_paid))),
            )
            .service(web::resource("/dashboard").route(web::get().to(payment::dashboard)))
            .service(web::resource("/companies").route(web::get().to(company::list_companies))),
    );
}
