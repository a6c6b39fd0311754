mod commands;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod voting;

use config::Config;
use db::SessionStore;
use handlers::session::SessionFlow;
use log::{error, info};
use tokio::io::BufReader;

#[tokio::main]
async fn main() {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    // Initialize session store
    let store = match db::open(&config.store).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open session store: {}", e);
            return;
        }
    };

    match store.load().await {
        Ok(data) => info!("Loaded {} existing session(s)", data.sessions.len()),
        Err(e) => {
            error!("Failed to read session store: {}", e);
            return;
        }
    }

    let flow = SessionFlow::new(store, config);
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    if let Err(why) = handlers::run_console(&flow, stdin, &mut stdout).await {
        error!("Console error: {}", why);
    }
}
