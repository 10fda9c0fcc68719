use actix_cors::Cors;
use actix_web::{
    self,
    middleware::{from_fn, Logger},
    web, App, HttpServer,
};
use std::sync::Arc;

use crate::{
    api::error,
    configs::{connect_database, run_migrations},
    constants::Env,
    middlewares::authentication,
    modules::{
        connection::{
            repository_pg::ConnectionRepositoryPg, service::ConnectionService,
            suggestion::SuggestionSettings,
        },
        post::{repository_pg::PostRepositoryPg, service::PostService},
        user::{repository_pg::UserRepositoryPg, service::UserService},
    },
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
#[cfg(test)]
mod test;
mod utils;

#[actix_web::get("/")]
async fn health_check(db_pool: web::Data<sqlx::PgPool>) -> Result<&'static str, error::Error> {
    sqlx::query("SELECT 1")
        .execute(db_pool.get_ref())
        .await
        .map_err(error::SystemError::from)?;
    Ok("Server is running")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    log::info!("Environment variables loaded from .env file");

    let env = Env::load().map_err(std::io::Error::other)?;

    let db_pool = connect_database(&env).await.map_err(|e| {
        log::error!("{e}");
        std::io::Error::other("Database connection error")
    })?;
    run_migrations(&db_pool).await.map_err(|e| {
        log::error!("{e:?}");
        std::io::Error::other("Database migration error")
    })?;

    let user_repo = Arc::new(UserRepositoryPg::new(db_pool.clone()));
    let connection_repo = Arc::new(ConnectionRepositoryPg::new(db_pool.clone()));
    let post_repo = Arc::new(PostRepositoryPg::new(db_pool.clone()));

    let settings = SuggestionSettings {
        weights: env.suggestion_weights,
        pool_size: env.suggestion_pool_size,
    };
    let addr = (env.ip.clone(), env.port);
    let env = web::Data::new(env);

    let user_service = UserService::with_dependencies(user_repo.clone(), env.clone().into_inner());
    let post_service =
        PostService::with_dependencies(post_repo, connection_repo.clone(), user_repo.clone());
    let connection_service =
        ConnectionService::with_dependencies(connection_repo, user_repo, settings);

    log::info!("Starting server at http://{}:{}", addr.0, addr.1);
    HttpServer::new(move || {
        let cors = env
            .frontend_urls
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(env.clone())
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(connection_service.clone()))
            .app_data(web::Data::new(post_service.clone()))
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::PathConfig::default().error_handler(|err, _| {
                error::Error::bad_request(format!("Invalid path parameter: {err}")).into()
            }))
            .service(health_check)
            .service(
                web::scope("/api")
                    .configure(modules::user::route::public_api_configure)
                    .configure(modules::connection::route::public_api_configure)
                    .service(
                        web::scope("")
                            .wrap(from_fn(authentication))
                            .configure(modules::user::route::configure)
                            .configure(modules::connection::route::configure)
                            .configure(modules::post::route::configure),
                    ),
            )
    })
    .bind(addr)?
    .workers(2)
    .run()
    .await
}
