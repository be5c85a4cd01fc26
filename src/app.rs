use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api;
use crate::config;
use crate::data::{
    HttpCommentService, HttpLikeService, HttpSessionService, HttpTweetService, HttpVideoService,
};
use crate::session;
use crate::storage;
use crate::ui;

pub fn run() -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let config_path = config::default_path();
    let display_path = friendly_path(config_path.as_ref());

    let client = Arc::new(
        api::Client::new(api::ClientConfig {
            user_agent: cfg.api.user_agent.clone(),
            base_url: Some(cfg.api.base_url.clone()),
            path_prefix: Some(cfg.api.path_prefix.clone()),
            timeout: Some(cfg.api.timeout),
        })
        .context("build api client")?,
    );

    let store = Arc::new(
        storage::Store::open(storage::Options {
            path: cfg.session.store_path.clone(),
        })
        .context("open session store")?,
    );

    let manager = Arc::new(session::Manager::new(client.clone(), store.clone()));
    let mut status = format!("Connected to {}. Press q to quit.", cfg.api.base_url);
    match manager.restore() {
        Ok(true) => status = "Session restored. Press q to quit.".to_string(),
        Ok(false) => {}
        Err(err) => status = format!("Saved session not restored: {err}"),
    }

    let options = ui::Options {
        status_message: status,
        session_service: Arc::new(HttpSessionService::new(manager.clone(), client.clone())),
        video_service: Arc::new(HttpVideoService::new(client.clone())),
        comment_service: Arc::new(HttpCommentService::new(client.clone())),
        tweet_service: Arc::new(HttpTweetService::new(client.clone())),
        like_service: Arc::new(HttpLikeService::new(client)),
        player: cfg.player.clone(),
        notice_ttl: cfg.ui.notice_ttl,
        config_path: display_path,
    };

    let mut model = ui::Model::new(options);
    model.run()
}

fn friendly_path(path: Option<&std::path::PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/vidtube/config.yaml".to_string()
    }
}
