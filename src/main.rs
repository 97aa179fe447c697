use std::{process, sync::Arc};

use brezza::{
    application::{
        contact::ContactService,
        error::AppError,
        feed::{FeedLimits, FeedService},
    },
    config,
    infra::{error::InfraError, http, store::SiteStore, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Check(_) => run_check(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let store = SiteStore::load(settings.content.root.clone()).await;

    let limits = FeedLimits {
        page_size: settings.content.page_size,
        home_posts: settings.content.home_posts,
        related_posts: settings.content.related_posts,
    };
    let feed = Arc::new(FeedService::new(store, limits));

    let contact = Arc::new(
        ContactService::new(settings.contact.endpoint.clone(), settings.contact.timeout)
            .map_err(|err| {
                AppError::unexpected(format!("failed to build contact relay client: {err}"))
            })?,
    );

    let state = http::HttpState {
        feed,
        contact,
        site: Arc::new(settings.site.clone()),
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "brezza::server",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

/// Validate the content root and report what it holds. Errors that the
/// server would degrade around are hard failures here.
async fn run_check(settings: config::Settings) -> Result<(), AppError> {
    let content = SiteStore::inspect(&settings.content.root).await?;

    info!(
        target = "brezza::check",
        root = %settings.content.root.display(),
        posts = content.catalog.len(),
        photos = content.photos.len(),
        videos = content.videos.len(),
        "content root is valid"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
}
