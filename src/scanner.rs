use serde::Serialize;

use crate::gallery::{classify_gallery_link, classify_page_link, GalleryId};

/// A sad panda link found in free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkMatch {
    Comic { id: GalleryId },
    Page { id: GalleryId, page: u32 },
}

/// Find every gallery and page link in `text`.
///
/// Gallery links come first, then page links, each in the order they appear.
/// Only whole whitespace-separated tokens are considered.
pub fn scan_message(text: &str) -> Vec<LinkMatch> {
    let comics = text
        .split_whitespace()
        .filter_map(classify_gallery_link)
        .map(|id| LinkMatch::Comic { id });
    let pages = text
        .split_whitespace()
        .filter_map(classify_page_link)
        .map(|(id, page)| LinkMatch::Page { id, page });
    comics.chain(pages).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_comics_before_pages() {
        let text = "look https://exhentai.org/s/tok/77-3 and\nhttps://e-hentai.org/g/12/abc/ also (https://exhentai.org/g/13/def/)";
        let found = scan_message(text);
        assert_eq!(
            found,
            vec![
                LinkMatch::Comic {
                    id: GalleryId::new("12", "abc").unwrap()
                },
                LinkMatch::Page {
                    id: GalleryId::new("77", "tok").unwrap(),
                    page: 3
                },
            ]
        );
    }

    #[test]
    fn plain_text_has_no_links() {
        assert!(scan_message("nothing to see here").is_empty());
        assert!(scan_message("").is_empty());
    }
}
