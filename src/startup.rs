use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{PasswordHasher, TokenCodec};
use crate::configuration::{Settings, StoreBackend};
use crate::error::AppError;
use crate::logger::LoggerMiddleware;
use crate::middleware::BearerAuth;
use crate::routes::{
    add_friend, extend, get_current_user, health_check, login, logout, register, update_current_user,
};
use crate::store::{InMemoryUserStore, PostgresUserStore, UserStore};

/// Build the user store selected by configuration, running migrations for
/// Postgres.
pub async fn build_store(settings: &Settings) -> Result<Arc<dyn UserStore>, AppError> {
    let hasher = PasswordHasher::new(settings.password.bcrypt_cost)?;
    tracing::info!(bcrypt_cost = hasher.cost(), "Password hasher configured");

    match settings.application.store {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory user store; data is lost on restart");
            Ok(Arc::new(InMemoryUserStore::new(hasher)))
        }
        StoreBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&settings.database.connection_string())
                .await
                .map_err(|e| AppError::Transient(format!("Database connection error: {}", e)))?;
            tracing::info!("Database connection pool created");

            let store = PostgresUserStore::new(pool, hasher);
            store.migrate().await?;
            Ok(Arc::new(store))
        }
    }
}

pub fn run(
    listener: TcpListener,
    store: Arc<dyn UserStore>,
    codec: TokenCodec,
) -> Result<Server, std::io::Error> {
    let codec = Arc::new(codec);
    let bearer = BearerAuth::new(store.clone(), codec.clone());
    let store_data: web::Data<dyn UserStore> = web::Data::from(store);
    let codec_data = web::Data::from(codec);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(store_data.clone())
            .app_data(codec_data.clone())

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/users")
                    // Public routes
                    .route("", web::post().to(register))
                    .route("/login", web::post().to(login))

                    // Protected routes (bearer token must be an active session)
                    .service(
                        web::resource("/logout")
                            .wrap(bearer.clone())
                            .route(web::delete().to(logout)),
                    )
                    .service(
                        web::resource("/extend")
                            .wrap(bearer.clone())
                            .route(web::patch().to(extend)),
                    )
                    .service(
                        web::resource("/me")
                            .wrap(bearer.clone())
                            .route(web::get().to(get_current_user))
                            .route(web::patch().to(update_current_user)),
                    )
                    .service(
                        web::resource("/friends")
                            .wrap(bearer.clone())
                            .route(web::patch().to(add_friend)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
