use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;

use crate::models::{GuildConfig, Snowflake};

/// Per-guild settings, stored in SQLite.
pub struct GuildConfigRepository {
    conn: Mutex<Connection>,
}

impl GuildConfigRepository {
    pub fn new(db_path: &Path) -> SqlResult<Self> {
        Self::from_connection(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> SqlResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> SqlResult<Self> {
        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    fn init_schema(&self) -> SqlResult<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS guild_configs (
                guild_id                 INTEGER PRIMARY KEY,
                nsfw_content_allowed     INTEGER NOT NULL DEFAULT 0,
                message_snooping_allowed INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS guild_art_channels (
                guild_id    INTEGER NOT NULL REFERENCES guild_configs(guild_id) ON DELETE CASCADE,
                channel_id  INTEGER NOT NULL,
                PRIMARY KEY (guild_id, channel_id)
            );
            ",
        )?;

        Ok(())
    }

    fn find_config(conn: &Connection, guild_id: Snowflake) -> SqlResult<Option<GuildConfig>> {
        let row = conn
            .query_row(
                "SELECT nsfw_content_allowed, message_snooping_allowed
                 FROM guild_configs WHERE guild_id = ?1",
                params![guild_id as i64],
                |row| Ok((row.get::<_, bool>(0)?, row.get::<_, bool>(1)?)),
            )
            .optional()?;

        let Some((nsfw_content_allowed, message_snooping_allowed)) = row else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT channel_id FROM guild_art_channels WHERE guild_id = ?1 ORDER BY channel_id",
        )?;
        let art_channels = stmt
            .query_map(params![guild_id as i64], |row| row.get::<_, i64>(0))?
            .map(|r| r.map(|id| id as Snowflake))
            .collect::<SqlResult<BTreeSet<_>>>()?;

        Ok(Some(GuildConfig {
            guild_id,
            art_channels,
            nsfw_content_allowed,
            message_snooping_allowed,
        }))
    }

    fn write_config(conn: &mut Connection, config: &GuildConfig) -> SqlResult<()> {
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO guild_configs (guild_id, nsfw_content_allowed, message_snooping_allowed)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(guild_id) DO UPDATE SET
                nsfw_content_allowed=excluded.nsfw_content_allowed,
                message_snooping_allowed=excluded.message_snooping_allowed",
            params![
                config.guild_id as i64,
                config.nsfw_content_allowed,
                config.message_snooping_allowed,
            ],
        )?;

        // Replace art channels - delete old, insert new
        tx.execute(
            "DELETE FROM guild_art_channels WHERE guild_id = ?1",
            params![config.guild_id as i64],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO guild_art_channels (guild_id, channel_id) VALUES (?1, ?2)",
            )?;
            for channel in &config.art_channels {
                stmt.execute(params![config.guild_id as i64, *channel as i64])?;
            }
        }
        tx.commit()
    }

    /// The stored config, or a freshly stored default one.
    pub fn get_config(&self, guild_id: Snowflake) -> SqlResult<GuildConfig> {
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(config) = Self::find_config(&conn, guild_id)? {
            return Ok(config);
        }

        log::info!("No guild config found for {}, creating a default one.", guild_id);
        let config = GuildConfig::new(guild_id);
        Self::write_config(&mut conn, &config)?;
        Ok(config)
    }

    pub fn set_config(&self, config: &GuildConfig) -> SqlResult<()> {
        log::debug!("Inserting guild config {:?}", config);
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        Self::write_config(&mut conn, config)
    }

    /// Read-modify-write under a single lock.
    pub fn edit_config<F>(&self, guild_id: Snowflake, edit: F) -> SqlResult<GuildConfig>
    where
        F: FnOnce(&mut GuildConfig),
    {
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut config =
            Self::find_config(&conn, guild_id)?.unwrap_or_else(|| GuildConfig::new(guild_id));
        edit(&mut config);
        Self::write_config(&mut conn, &config)?;
        Ok(config)
    }

    pub fn set_config_to_default(&self, guild_id: Snowflake) -> SqlResult<GuildConfig> {
        let config = GuildConfig::new(guild_id);
        self.set_config(&config)?;
        Ok(config)
    }

    pub fn art_channels(&self, guild_id: Snowflake) -> SqlResult<BTreeSet<Snowflake>> {
        Ok(self.get_config(guild_id)?.art_channels)
    }

    pub fn is_art_channel(&self, guild_id: Snowflake, channel_id: Snowflake) -> SqlResult<bool> {
        Ok(self.art_channels(guild_id)?.contains(&channel_id))
    }

    /// Returns whether the channel already was an art channel.
    pub fn add_art_channel(&self, guild_id: Snowflake, channel_id: Snowflake) -> SqlResult<bool> {
        let mut was_art_channel = false;
        self.edit_config(guild_id, |config| {
            was_art_channel = !config.art_channels.insert(channel_id);
        })?;
        Ok(was_art_channel)
    }

    /// Returns whether the channel was an art channel before removal.
    pub fn remove_art_channel(&self, guild_id: Snowflake, channel_id: Snowflake) -> SqlResult<bool> {
        let mut was_art_channel = false;
        self.edit_config(guild_id, |config| {
            was_art_channel = config.art_channels.remove(&channel_id);
        })?;
        Ok(was_art_channel)
    }

    pub fn is_nsfw_content_enabled(&self, guild_id: Snowflake) -> SqlResult<bool> {
        Ok(self.get_config(guild_id)?.nsfw_content_allowed)
    }

    pub fn set_nsfw_content_enabled(&self, guild_id: Snowflake, enabled: bool) -> SqlResult<()> {
        self.edit_config(guild_id, |config| config.nsfw_content_allowed = enabled)
            .map(|_| ())
    }

    pub fn is_message_snooping_allowed(&self, guild_id: Snowflake) -> SqlResult<bool> {
        Ok(self.get_config(guild_id)?.message_snooping_allowed)
    }

    pub fn set_message_snooping(&self, guild_id: Snowflake, allowed: bool) -> SqlResult<()> {
        self.edit_config(guild_id, |config| config.message_snooping_allowed = allowed)
            .map(|_| ())
    }

    /// Art channel, nsfw content allowed and an age-restricted channel.
    pub fn can_post_nsfw_content_in(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
        channel_is_nsfw: bool,
    ) -> SqlResult<bool> {
        let config = self.get_config(guild_id)?;
        Ok(config.art_channels.contains(&channel_id) && config.nsfw_content_allowed && channel_is_nsfw)
    }
}
