#[macro_use] extern crate rocket;

use std::{env, net::{IpAddr, Ipv4Addr}, sync::Arc, time::Duration};

use log::warn;
use rocket::{figment::Figment, Build, Config, Rocket};

use config::MatchboardConfig;
use storage::{document::DocumentStore, local::LocalStore, shared_bin::SharedBinStore};
use sync::SessionSynchronizer;

mod config;
mod http;
mod model;
mod scoring;
mod sheet;
mod storage;
mod sync;
mod util;

fn setup_logger() -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] [{}] {}",
                chrono::Local::now().format("[%Y-%m-%d] [%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

// shared handles for every route; cloning is cheap
#[derive(Clone)]
pub struct MatchboardState {
    pub config: Arc<MatchboardConfig>,
    pub synchronizer: Arc<SessionSynchronizer>
}

fn rocket(state: MatchboardState) -> Rocket<Build> {
    let mounts: Vec<&dyn Fn(Rocket<Build>) -> Rocket<Build>> = vec![
        &http::status::mount,
        &http::auth::mount,
        &http::session::mount,
        &http::settings::mount,
        &http::sync::mount
    ];
    let is_debug = env::var("MATCHBOARD_DEBUG").unwrap_or_else(|_| "false".to_owned()).parse::<bool>().unwrap_or(false);
    let http_port = env::var("MATCHBOARD_HTTP_PORT")
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(state.config.port);
    let rocket_config: Config = Figment::from(
        if is_debug { Config::debug_default() } else { Config::release_default() }
    )
        .merge::<(&str, IpAddr)>(("address", Ipv4Addr::new(0, 0, 0, 0).into()))
        .merge(("port", http_port))
        .extract()
        .unwrap_or_default();
    let rocket_build = rocket::custom(rocket_config).manage(state);

    mounts.iter().fold(rocket_build, |build, mount_fn| (mount_fn)(build))
}

#[tokio::main]
async fn main() -> Result<(), String> {
    match setup_logger() {
        Ok(_) => (),
        Err(e) => return Err(format!("Logger Setup Error: {}", e))
    };

    let matchboard_config = Arc::new(config::load_config().await);

    let local = Arc::new(LocalStore::new(&matchboard_config.data_dir));

    // a configured document store is authoritative; if it cannot be reached
    // the system degrades to local-only instead of refusing to start
    let document = match &matchboard_config.mongo_url {
        Some(url) => match DocumentStore::connect(url).await {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                warn!("Document store unavailable, degrading to local mode: {}", e);
                None
            }
        },
        None => None
    };

    let initial_code = match &matchboard_config.sync_code {
        Some(code) => Some(code.clone()),
        None => local.device_state().await.sync_code
    };

    let bin = matchboard_config.bin_base_url.as_ref().map(|base_url| {
        Arc::new(SharedBinStore::new(
            base_url.clone(),
            matchboard_config.bin_api_key.clone(),
            initial_code.clone()
        ))
    });

    let synchronizer = Arc::new(SessionSynchronizer::new(
        local,
        bin,
        document,
        initial_code,
        Duration::from_secs(matchboard_config.poll_interval_secs)
    ));
    synchronizer.refresh().await;
    let poll_task = synchronizer.spawn();

    let state = MatchboardState {
        config: Arc::clone(&matchboard_config),
        synchronizer: Arc::clone(&synchronizer)
    };

    let launched = rocket(state).launch().await;
    poll_task.abort();
    match launched {
        Ok(_) => Ok(()),
        Err(rocket_err) => Err(format!("{}", rocket_err))
    }
}
