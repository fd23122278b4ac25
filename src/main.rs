// src/main.rs

mod app_state;
mod auth;
mod config;
mod dashboard;
mod data_store;
mod db;
mod derive;
mod error;
mod forms;
mod member;
mod models;
mod notifier;
mod project;
mod routes;
mod service;
mod storage;
mod task;
mod transfer;
mod workspace;
mod ws;

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix::Actor;
use actix_cors::Cors;
use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http,
    middleware::Logger,
    web, App, Error, HttpMessage, HttpServer,
};
use env_logger::Env;
use futures::future::{ok, Ready};
use log::{error, info};

use crate::app_state::AppState;
use crate::config::{Config, StorageBackend};
use crate::notifier::ChangeHub;
use crate::storage::{KeyValueStore, MemoryStore, MongoStore};

/// Attaches the caller's `Session` to the request when a live bearer token
/// is present. Handlers decide whether a session is required.
#[derive(Debug)]
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware {
            service: Rc::new(service),
        })
    }
}

pub struct AuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            // Extract "Bearer <token>" from the Authorization header if present
            let token = req
                .headers()
                .get(http::header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
                .map(|t| t.trim().to_string());
            let state = req.app_data::<web::Data<AppState>>().cloned();
            if let (Some(token), Some(state)) = (token, state) {
                if let Some(session) = state.auth.get_session(&token).await {
                    req.extensions_mut().insert(session);
                }
            }
            let res = service.call(req).await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

async fn open_backend(config: &Config) -> std::io::Result<Arc<dyn KeyValueStore>> {
    match config.storage_backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Mongo => {
            let uri = config.mongo_uri.as_deref().unwrap_or_default();
            let mongodb = db::MongoDB::init(uri, &config.database_name)
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
            info!("Using MongoDB database {}", config.database_name);
            Ok(Arc::new(MongoStore::new(Arc::new(mongodb))))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;
    let kv = open_backend(&config).await?;
    let change_hub = ChangeHub::new().start();
    let state = AppState::new(config.clone(), kv, change_hub);

    info!("Server running at http://{}", config.bind_addr);
    info!("Allowed CORS Origin: {}", config.frontend_origin);

    let frontend_origin = config.frontend_origin.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .expose_headers(vec![http::header::CONTENT_DISPOSITION])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Authentication)
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure)
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
