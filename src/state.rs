use std::fs;
use std::sync::Arc;

use crate::config::BotConfig;
use crate::controller::SadPandaController;
use crate::db::GuildConfigRepository;
use crate::upload::{Catbox, FileUploader};

/// Everything the bot's handlers share.
pub struct AppState {
    pub config: BotConfig,
    pub controller: Arc<SadPandaController>,
    pub guilds: Arc<GuildConfigRepository>,
}

impl AppState {
    pub fn new(config: BotConfig) -> Result<Self, String> {
        let data_dir = config.data_directory();
        fs::create_dir_all(&data_dir)
            .map_err(|e| format!("Failed to create data directory {}: {}", data_dir.display(), e))?;

        let guilds = GuildConfigRepository::new(&config.database_path())
            .map_err(|e| format!("Failed to initialize database: {}", e))?;

        let uploader: Arc<dyn FileUploader> =
            Arc::new(Catbox::new(config.file_hosts.catbox.user_hash.clone()));
        let controller = SadPandaController::new(&config.sad_panda, uploader)
            .map_err(|e| format!("Failed to create sad panda http client: {}", e))?;
        if !controller.can_scrape() {
            log::warn!("Sad panda functionality is turned off, as no cookies were provided.");
        }

        Ok(Self {
            config,
            controller: Arc::new(controller),
            guilds: Arc::new(guilds),
        })
    }

    pub fn shutdown(&self) {
        self.controller.close();
    }
}
