//! Authentication and session service

use std::io::read_to_string;
use std::time::Duration;

use actix_web::{App, HttpServer};
use clap::Parser;
use color_eyre::Result;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;

use crate::config::{Config, LogFormat};
use crate::model::Model;
use crate::opt::Opt;
use crate::service::session::CookiePolicy;

mod config;
pub mod model;
mod opt;
mod service;

/// Initializes tracing collection
fn setup_tracing(config: config::Logging) -> Result<()> {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let fmt_layer = match config.format {
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let filter_layer = config
        .filters
        .into_iter()
        .fold(filter_layer, |layer, filter| layer.add_directive(filter));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();

    Ok(())
}

/// Periodically removes expired sessions
///
/// Validation never relies on the sweep, it only keeps the sessions table from growing.
async fn sweep_expired_sessions(model: Model, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match model.cleanup().await {
            Ok(0) => (),
            Ok(removed) => info!(removed, "Expired sessions swept"),
            Err(err) => error!(%err, "Expired sessions sweep failed"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let Opt {
        config: mut config_file,
    } = Opt::parse();

    let config = read_to_string(&mut config_file)?;
    let config: Config = toml::from_str(&config)?;

    setup_tracing(config.logging)?;
    color_eyre::install()?;

    info!(
        config = ?config_file.path().path(),
        "Tracing initialized, setting up a service"
    );

    let model = Model::with_config(config.db, &config.auth).await?;

    if config.auth.sweep_interval_secs > 0 {
        let period = Duration::from_secs(config.auth.sweep_interval_secs);
        tokio::spawn(sweep_expired_sessions(model.clone(), period));
    }

    let cookies = CookiePolicy {
        secure: config.auth.production,
        lifetime_days: config.auth.session_lifetime_days,
    };
    let service_config = service::configure(cookies, model);
    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .configure(service_config.clone())
    })
    .bind(config.host)?
    .run()
    .await?;

    info!("Service stopped, tearing down");
    Ok(())
}
