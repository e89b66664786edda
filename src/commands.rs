use std::path::{Path, PathBuf};

use crate::gallery::{classify_gallery_link, classify_page_link, GalleryId};
use crate::models::{Comic, GuildConfig, ImageContent, PageLocator, Snowflake};
use crate::scanner::{self, LinkMatch};
use crate::state::AppState;

fn gallery_link(url: &str) -> Result<GalleryId, String> {
    classify_gallery_link(url.trim()).ok_or_else(|| format!("'{}' is not a gallery link", url))
}

fn page_link(url: &str) -> Result<(GalleryId, u32), String> {
    classify_page_link(url.trim()).ok_or_else(|| format!("'{}' is not a page link", url))
}

pub async fn fetch_comic(state: &AppState, url: &str) -> Result<Comic, String> {
    let id = gallery_link(url)?;
    state
        .controller
        .get_comic(&id)
        .await
        .map_err(|e| e.to_string())
}

pub async fn fetch_comic_pages(state: &AppState, url: &str) -> Result<Vec<PageLocator>, String> {
    let id = gallery_link(url)?;
    state
        .controller
        .get_comic_pages(&id)
        .await
        .map_err(|e| e.to_string())
}

pub async fn fetch_page(state: &AppState, url: &str) -> Result<ImageContent, String> {
    let (id, page) = page_link(url)?;
    state
        .controller
        .get_comic_page_contents(&id, page)
        .await
        .map_err(|e| e.to_string())
}

/// Download a page into `out`, or into the data directory under its own name.
pub async fn save_page(state: &AppState, url: &str, out: Option<&Path>) -> Result<PathBuf, String> {
    let contents = fetch_page(state, url).await?;
    let path = match out {
        Some(path) => path.to_path_buf(),
        None => state.config.data_directory().join(&contents.name),
    };
    tokio::fs::write(&path, &contents.content)
        .await
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
    Ok(path)
}

pub async fn upload_page(state: &AppState, url: &str) -> Result<String, String> {
    let (id, page) = page_link(url)?;
    state
        .controller
        .get_comic_page(&id, page)
        .await
        .map_err(|e| e.to_string())
}

pub fn scan_text(text: &str) -> Vec<LinkMatch> {
    scanner::scan_message(text)
}

// --- Guild configuration ---

pub fn guild_show(state: &AppState, guild: Snowflake) -> Result<GuildConfig, String> {
    state.guilds.get_config(guild).map_err(|e| e.to_string())
}

pub fn guild_set_nsfw_content(state: &AppState, guild: Snowflake, allowed: bool) -> Result<String, String> {
    state
        .guilds
        .set_nsfw_content_enabled(guild, allowed)
        .map_err(|e| e.to_string())?;
    Ok(format!("NSFW content is now {}.", format_allowed(allowed)))
}

pub fn guild_set_message_snooping(
    state: &AppState,
    guild: Snowflake,
    allowed: bool,
) -> Result<String, String> {
    state
        .guilds
        .set_message_snooping(guild, allowed)
        .map_err(|e| e.to_string())?;
    Ok(format!("Message snooping is now {}.", format_allowed(allowed)))
}

pub fn guild_add_art_channel(state: &AppState, guild: Snowflake, channel: Snowflake) -> Result<String, String> {
    let already = state
        .guilds
        .add_art_channel(guild, channel)
        .map_err(|e| e.to_string())?;
    if already {
        Ok(format!("<#{}> is already an art channel.", channel))
    } else {
        Ok(format!("<#{}> has been added as an art channel.", channel))
    }
}

pub fn guild_remove_art_channel(
    state: &AppState,
    guild: Snowflake,
    channel: Snowflake,
) -> Result<String, String> {
    let removed = state
        .guilds
        .remove_art_channel(guild, channel)
        .map_err(|e| e.to_string())?;
    if removed {
        Ok(format!("Removed channel <#{}> from art channels.", channel))
    } else {
        Ok(format!("<#{}> is not an art channel.", channel))
    }
}

pub fn guild_reset(state: &AppState, guild: Snowflake) -> Result<String, String> {
    state
        .guilds
        .set_config_to_default(guild)
        .map_err(|e| e.to_string())?;
    Ok("The config for this guild has been reset to the default values.".to_string())
}

fn format_allowed(allowed: bool) -> &'static str {
    if allowed {
        "allowed"
    } else {
        "not allowed"
    }
}
