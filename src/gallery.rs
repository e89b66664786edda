use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

pub const SAD_PANDA_BASE: &str = "https://exhentai.org";
pub const SAD_PANDA_COOKIE_DOMAIN: &str = ".exhentai.org";

/// Identifies a single gallery: numeric id plus opaque hash token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GalleryId {
    id: String,
    hash: String,
}

impl GalleryId {
    /// Returns `None` when `id` is not purely numeric or `hash` is empty.
    pub fn new(id: impl Into<String>, hash: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let hash = hash.into();
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) || hash.is_empty() {
            return None;
        }
        Some(Self { id, hash })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn gallery_url(&self, base: &str) -> String {
        format!("{}/g/{}/{}/", base, self.id, self.hash)
    }

    /// URL of listing page `index` of the gallery's thumbnail grid.
    pub fn listing_url(&self, base: &str, index: u32) -> String {
        format!("{}?p={}", self.gallery_url(base), index)
    }

    /// URL of the page viewer for image `page`; here `hash` is the image token.
    pub fn page_url(&self, base: &str, page: u32) -> String {
        format!("{}/s/{}/{}-{}", base, self.hash, self.id, page)
    }
}

impl fmt::Display for GalleryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id, self.hash)
    }
}

/// Whole-token pattern for gallery links: `.../g/{id}/{hash}/`.
pub fn comic_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?i:https?)://)?(?:(?i:www)\.)?(?i:e[x-]hentai\.org)/g/(\d+)/([A-Za-z0-9_]+)/?$")
            .expect("valid comic url regex")
    })
}

/// Whole-token pattern for page links: `.../s/{hash}/{id}-{page}/`.
pub fn page_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:(?i:https?)://)?(?:(?i:www)\.)?(?i:e[x-]hentai\.org)/s/([A-Za-z0-9_]+)/(\d+)-(\d+)/?$",
        )
        .expect("valid page url regex")
    })
}

/// Classifies `s` as a gallery link. Partial matches inside longer text are rejected.
pub fn classify_gallery_link(s: &str) -> Option<GalleryId> {
    let caps = comic_url_regex().captures(s)?;
    GalleryId::new(&caps[1], &caps[2])
}

/// Classifies `s` as a page link, yielding the gallery id (with the image
/// token as hash) and the page number.
pub fn classify_page_link(s: &str) -> Option<(GalleryId, u32)> {
    let caps = page_url_regex().captures(s)?;
    let page = caps[3].parse().ok()?;
    GalleryId::new(&caps[2], &caps[1]).map(|id| (id, page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gallery_links_accept_all_host_forms() {
        let expected = GalleryId::new("2230000", "a1b2c3d4e5").unwrap();
        for link in [
            "https://exhentai.org/g/2230000/a1b2c3d4e5/",
            "http://e-hentai.org/g/2230000/a1b2c3d4e5",
            "exhentai.org/g/2230000/a1b2c3d4e5/",
            "www.e-hentai.org/g/2230000/a1b2c3d4e5",
            "https://www.ExHentai.ORG/g/2230000/a1b2c3d4e5/",
        ] {
            assert_eq!(classify_gallery_link(link), Some(expected.clone()), "{link}");
        }
    }

    #[test]
    fn gallery_links_must_match_whole_token() {
        for text in [
            "see https://exhentai.org/g/1/abc/",
            "https://exhentai.org/g/1/abc/extra",
            "https://exhentai.org/g/abc/def/",
            "https://e.hentai.org/g/1/abc/",
            "https://exhentai.org/s/abc/1-2/",
            "",
        ] {
            assert_eq!(classify_gallery_link(text), None, "{text}");
        }
    }

    #[test]
    fn page_links_round_trip_to_page_url() {
        let (id, page) = classify_page_link("https://e-hentai.org/s/0f1e2d3c4b/2230000-17/").unwrap();
        assert_eq!(id.id(), "2230000");
        assert_eq!(id.hash(), "0f1e2d3c4b");
        assert_eq!(page, 17);

        let url = id.page_url(SAD_PANDA_BASE, page);
        assert_eq!(url, "https://exhentai.org/s/0f1e2d3c4b/2230000-17");
        assert_eq!(classify_page_link(&url), Some((id, page)));
    }

    #[test]
    fn page_links_reject_gallery_links_and_junk() {
        assert_eq!(classify_page_link("https://exhentai.org/g/1/abc/"), None);
        assert_eq!(classify_page_link("https://exhentai.org/s/abc/1-x/"), None);
        assert_eq!(classify_page_link("xhttps://exhentai.org/s/abc/1-2/"), None);
    }

    #[test]
    fn tokens_are_ascii_word_characters_only() {
        assert_eq!(classify_gallery_link("https://exhentai.org/g/1/äbc/"), None);
        assert_eq!(classify_page_link("https://exhentai.org/s/ßx/1-2"), None);
        assert_eq!(
            classify_gallery_link("https://exhentai.org/g/1/a_B9/"),
            GalleryId::new("1", "a_B9")
        );
    }

    #[test]
    fn identifiers_must_be_numeric() {
        assert!(GalleryId::new("12a", "abc").is_none());
        assert!(GalleryId::new("", "abc").is_none());
        assert!(GalleryId::new("12", "").is_none());
        assert_eq!(GalleryId::new("12", "abc").unwrap().to_string(), "12/abc");
    }

    #[test]
    fn gallery_urls_are_canonical() {
        let id = GalleryId::new("12", "abc").unwrap();
        assert_eq!(id.gallery_url(SAD_PANDA_BASE), "https://exhentai.org/g/12/abc/");
        assert_eq!(id.listing_url(SAD_PANDA_BASE, 2), "https://exhentai.org/g/12/abc/?p=2");
    }
}
