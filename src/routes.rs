use crate::{
    api::{attendance, me, message, report, staff},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::governor::{clock::QuantaInstant, middleware::NoOpMiddleware};
use actix_governor::{Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor};
use actix_web::{middleware::from_fn, web};

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(
        requests_per_min: u32,
    ) -> GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap()
    }

    let login_limiter = build_limiter(config.rate_login_per_min);
    let register_limiter = build_limiter(config.rate_register_per_min);
    let refresh_limiter = build_limiter(config.rate_refresh_per_min);
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(Governor::new(&login_limiter))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(Governor::new(&register_limiter))
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(Governor::new(&refresh_limiter))
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(Governor::new(&login_limiter))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Governor::new(&protected_limiter)) // rate limiting
            .service(
                web::scope("/me")
                    .service(web::resource("/attendance").route(web::get().to(me::my_attendance)))
                    .service(web::resource("/status").route(web::get().to(me::my_status)))
                    .service(web::resource("/messages").route(web::get().to(me::my_messages)))
                    .service(web::resource("/qr").route(web::get().to(me::my_qr))),
            )
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(web::resource("").route(web::get().to(report::list)))
                    .service(web::resource("/scan").route(web::post().to(attendance::scan)))
                    .service(web::resource("/toggle").route(web::post().to(attendance::toggle)))
                    .service(web::resource("/mark").route(web::post().to(attendance::mark)))
                    .service(web::resource("/export").route(web::get().to(report::export)))
                    // /attendance/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(attendance::edit))
                            .route(web::delete().to(attendance::delete)),
                    ),
            )
            .service(
                web::scope("/staff")
                    // /staff
                    .service(
                        web::resource("")
                            .route(web::post().to(staff::create_staff))
                            .route(web::get().to(staff::list_staff)),
                    )
                    // /staff/{id}
                    .service(web::resource("/{id}").route(web::delete().to(staff::delete_staff)))
                    .service(web::resource("/{id}/qr").route(web::get().to(staff::staff_qr))),
            )
            .service(
                web::scope("/messages")
                    .service(web::resource("").route(web::post().to(message::send))),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)
//
// API REQUEST
//  └─ Authorization: Bearer access_token
//
// ACCESS EXPIRED
//  └─ POST /refresh with refresh_token
//       └─ returns new access_token
