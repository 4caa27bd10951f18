use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::http::header;
use actix_web::middleware::NormalizePath;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::AuthFlow;
use crate::logger::RequestLogger;
use crate::middleware::JwtMiddleware;
use crate::routes::{get_current_user, health_check, login, refresh, register};

/// Auth request bodies are tiny; anything bigger is rejected before parsing.
const MAX_JSON_PAYLOAD: usize = 4 * 1024;

/// Browser clients may call from any origin; credentials travel in the
/// `Authorization` header, never in cookies.
fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "HEAD", "PUT", "PATCH", "POST", "DELETE"])
        .allowed_headers(vec![
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
        .max_age(3600)
}

pub fn run(listener: TcpListener, flow: AuthFlow) -> Result<Server, std::io::Error> {
    let verifier = flow.verifier().clone();
    let flow = web::Data::new(flow);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(cors())
            .wrap(NormalizePath::trim())
            .wrap(RequestLogger)
            .app_data(flow.clone())
            .app_data(web::JsonConfig::default().limit(MAX_JSON_PAYLOAD))
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/auth")
                            .route("/token", web::post().to(login))
                            .route("/register", web::post().to(register))
                            .route("/refresh-token", web::post().to(refresh)),
                    )
                    .service(
                        web::scope("/user")
                            .wrap(JwtMiddleware::new(verifier.clone()))
                            .route("/me", web::get().to(get_current_user)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
