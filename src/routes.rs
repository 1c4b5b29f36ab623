use std::sync::Arc;

use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

use crate::{
    api::{account, department, employee, request, status, workflow},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};

/// Per-peer limiter allowing `requests_per_min` with an equal burst.
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let account_limiter = Arc::new(build_limiter(config.rate_account_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public, served in maintenance too
    cfg.route("/api/status", web::get().to(status::service_status))
        .route("/accounts/verify-email", web::get().to(account::verify_email))
        .route(
            "/account/verify-email",
            web::get().to(account::redirect_verify_email),
        );

    cfg.service(
        web::scope("/accounts")
            .service(
                web::resource("/register")
                    .wrap(account_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/authenticate")
                    .wrap(account_limiter.clone())
                    .route(web::post().to(handlers::authenticate)),
            )
            .service(
                web::resource("/refresh-token")
                    .wrap(account_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/revoke-token")
                    .wrap(account_limiter.clone())
                    .route(web::post().to(handlers::revoke_token)),
            )
            .service(
                web::resource("")
                    .wrap(from_fn(auth_middleware))
                    .wrap(protected_limiter.clone())
                    .route(web::get().to(account::list_accounts)),
            ),
    );

    cfg.service(
        web::scope("/departments")
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter.clone())
            // /departments
            .service(
                web::resource("")
                    .route(web::get().to(department::list_departments))
                    .route(web::post().to(department::create_department)),
            )
            // /departments/{id}
            .service(
                web::resource("/{id}")
                    .route(web::get().to(department::get_department))
                    .route(web::put().to(department::update_department))
                    .route(web::delete().to(department::delete_department)),
            ),
    );

    cfg.service(
        web::scope("/employees")
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter.clone())
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
                    .route(web::put().to(employee::update_employee))
                    .route(web::delete().to(employee::delete_employee)),
            )
            // /employees/{id}/transfer
            .service(
                web::resource("/{id}/transfer")
                    .route(web::post().to(employee::transfer_employee)),
            ),
    );

    cfg.service(
        web::scope("/workflows")
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter.clone())
            .service(web::resource("").route(web::get().to(workflow::list_workflows)))
            .service(web::resource("/{id}").route(web::get().to(workflow::get_workflow)))
            .service(
                web::resource("/{id}/approve").route(web::put().to(workflow::approve_workflow)),
            )
            .service(
                web::resource("/{id}/reject").route(web::put().to(workflow::reject_workflow)),
            ),
    );

    cfg.service(
        web::scope("/requests")
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::resource("")
                    .route(web::get().to(request::list_requests))
                    .route(web::post().to(request::create_request)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(request::get_request))
                    .route(web::delete().to(request::delete_request)),
            ),
    );
}
