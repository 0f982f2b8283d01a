pub mod auth;
pub mod config;
pub mod error;
pub mod panic_handler;
pub mod routes;
pub mod shared_state;
pub mod tracing_config;

pub use error::Error;

use axum::{routing::IntoMakeService, Router};
use hackvote_db::DurableStore;
use hyper::server::conn::AddrIncoming;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::{event, Level};

use crate::shared_state::InnerState;

pub struct Server {
    pub host: String,
    pub port: u16,
    /// The system of record behind this gateway. Exposed so embedding code
    /// and tests can seed or read it directly.
    pub store: Arc<DurableStore>,
    pub server: axum::Server<AddrIncoming, IntoMakeService<Router>>,
}

pub async fn run_server(config: config::Config) -> Result<Server, anyhow::Error> {
    let store = Arc::new(DurableStore::new());
    run_server_with_store(config, store).await
}

pub async fn run_server_with_store(
    config: config::Config,
    store: Arc<DurableStore>,
) -> Result<Server, anyhow::Error> {
    let production = config.env != "development" && !cfg!(debug_assertions);

    let state = Arc::new(InnerState {
        production,
        store: store.clone(),
        feed_poll_timeout: Duration::from_millis(config.feed_poll_timeout_ms),
    });

    let app = routes::configure_routes().with_state(state).layer(
        // Global middlewares
        ServiceBuilder::new()
            .layer(CatchPanicLayer::custom(move |err| {
                panic_handler::handle_panic(production, err)
            }))
            .compression()
            .decompression()
            .set_x_request_id(MakeRequestUuid)
            .propagate_x_request_id()
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO))
                    .on_request(DefaultOnRequest::new().level(Level::INFO)),
            )
            .into_inner(),
    );

    let bind_ip: IpAddr = config.host.parse()?;
    let addr = SocketAddr::from((bind_ip, config.port));
    let builder = axum::Server::bind(&addr);

    let server = builder.serve(app.into_make_service());
    let port = server.local_addr().port();
    event!(Level::INFO, "Listening on {}:{}", config.host, port);

    Ok(Server {
        host: config.host,
        port,
        store,
        server,
    })
}
