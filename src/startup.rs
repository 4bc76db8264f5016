use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;

use crate::configuration::{DatabaseSettings, Settings};
use crate::email_client::EmailClient;
use crate::error::json_error_handler;
use crate::logger::RequestLogger;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    activate, create_comment, create_post, delete_comment, delete_post, delete_user, get_comment,
    get_post, get_user, health_check, list_posts, login, logout, patch_comment, patch_post,
    patch_user, refresh, register, replace_comment, replace_post, replace_user,
};
use crate::security::security_headers;

pub async fn get_connection_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&settings.connection_string())
        .await
}

pub fn run(listener: TcpListener, connection: PgPool, settings: Settings) -> Result<Server, std::io::Error> {
    let email_client = EmailClient::from_settings(&settings.email_client)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    let connection = web::Data::new(connection);
    let jwt_config = settings.jwt.clone();
    let jwt_config_data = web::Data::new(settings.jwt);
    let cookie_settings = web::Data::new(settings.cookie);
    let app_settings = web::Data::new(settings.application);
    let email_client = web::Data::new(email_client);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware; the last one wrapped runs first
            .wrap(security_headers())
            .wrap(RequestLogger)
            .wrap(Logger::default())

            // Shared state
            .app_data(connection.clone())
            .app_data(jwt_config_data.clone())
            .app_data(cookie_settings.clone())
            .app_data(app_settings.clone())
            .app_data(email_client.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/accounts")
                            // No identity: a stale Authorization header must not block these
                            .route("/users", web::post().to(register))
                            .route("/login", web::post().to(login))
                            .route("/refresh", web::post().to(refresh))
                            .route("/activate/{uidb64}/{token}", web::get().to(activate))
                            .service(
                                web::resource("/users")
                                    .wrap(JwtMiddleware::new(jwt_config.clone()))
                                    .route(web::get().to(get_user))
                                    .route(web::put().to(replace_user))
                                    .route(web::patch().to(patch_user))
                                    .route(web::delete().to(delete_user)),
                            )
                            .service(
                                web::resource("/logout")
                                    .wrap(JwtMiddleware::new(jwt_config.clone()))
                                    .route(web::post().to(logout)),
                            ),
                    )
                    .service(
                        web::scope("/boards")
                            .wrap(JwtMiddleware::new(jwt_config.clone()))
                            .service(
                                web::resource("/posts")
                                    .route(web::get().to(list_posts))
                                    .route(web::post().to(create_post)),
                            )
                            .service(
                                web::resource("/posts/{id}")
                                    .route(web::get().to(get_post))
                                    .route(web::put().to(replace_post))
                                    .route(web::patch().to(patch_post))
                                    .route(web::delete().to(delete_post)),
                            )
                            .service(
                                web::resource("/comments").route(web::post().to(create_comment)),
                            )
                            .service(
                                web::resource("/comments/{id}")
                                    .route(web::get().to(get_comment))
                                    .route(web::put().to(replace_comment))
                                    .route(web::patch().to(patch_comment))
                                    .route(web::delete().to(delete_comment)),
                            ),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
