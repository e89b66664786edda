use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::gallery::{GalleryId, SAD_PANDA_BASE};

/// Discord ids are carried around as plain integers.
pub type Snowflake = u64;

/// A tag namespace such as `female` or `language`.
///
/// Two categories are equal iff their names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagCategory {
    name: String,
}

impl TagCategory {
    pub fn of(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TagCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub category: TagCategory,
    pub name: String,
    pub link: Option<String>,
}

/// Tags grouped by category, in the order the categories appear on the page.
///
/// Never holds a category with an empty tag list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMap {
    entries: Vec<(TagCategory, Vec<Tag>)>,
}

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any previous tags for `category`. Empty lists remove the category.
    pub fn insert(&mut self, category: TagCategory, tags: Vec<Tag>) {
        let existing = self.entries.iter().position(|(c, _)| *c == category);
        match (existing, tags.is_empty()) {
            (Some(idx), true) => {
                self.entries.remove(idx);
            }
            (Some(idx), false) => self.entries[idx].1 = tags,
            (None, true) => {}
            (None, false) => self.entries.push((category, tags)),
        }
    }

    pub fn get(&self, category: &str) -> Option<&[Tag]> {
        self.entries
            .iter()
            .find(|(c, _)| c.name() == category)
            .map(|(_, tags)| tags.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TagCategory, &[Tag])> {
        self.entries.iter().map(|(c, tags)| (c, tags.as_slice()))
    }
}

/// Raw image bytes plus the file name they should be stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImageContent {
    #[serde(skip)]
    pub content: Vec<u8>,
    pub name: String,
}

impl ImageContent {
    pub fn new(content: Vec<u8>, name: impl Into<String>) -> Self {
        Self {
            content,
            name: name.into(),
        }
    }

    /// Builds the content for `url`, naming it after the last path segment.
    pub fn from_url(content: Vec<u8>, url: &str) -> Self {
        let name = url.rsplit('/').next().unwrap_or(url);
        Self::new(content, name)
    }
}

/// Metadata scraped from a gallery's main page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comic {
    pub id: GalleryId,
    pub main_title: String,
    pub sub_title: Option<String>,
    pub tags: TagMap,
    pub cover: ImageContent,
    pub published_at: NaiveDateTime,
    pub page_count: u32,
    pub favorite_count: u32,
}

impl Comic {
    pub fn url(&self) -> String {
        self.id.gallery_url(SAD_PANDA_BASE)
    }

    /// The publish date is shown without a zone on the site and is UTC.
    pub fn published_at_utc(&self) -> DateTime<Utc> {
        self.published_at.and_utc()
    }
}

/// One image of a gallery as listed in the thumbnail grid.
///
/// `identifier` carries the gallery id together with the image's own token,
/// `page_index` is the listing page the thumbnail was found on and
/// `page_number` is the image's number within the gallery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageLocator {
    pub identifier: GalleryId,
    pub page_index: u32,
    pub page_number: u32,
}

impl PageLocator {
    pub fn page_url(&self, base: &str) -> String {
        self.identifier.page_url(base, self.page_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildConfig {
    pub guild_id: Snowflake,
    pub art_channels: BTreeSet<Snowflake>,
    pub nsfw_content_allowed: bool,
    pub message_snooping_allowed: bool,
}

impl GuildConfig {
    pub fn new(guild_id: Snowflake) -> Self {
        Self {
            guild_id,
            art_channels: BTreeSet::new(),
            nsfw_content_allowed: false,
            message_snooping_allowed: false,
        }
    }
}
