use chrono::NaiveDateTime;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;
use url::Url;

use crate::error::ExtractError;
use crate::gallery::{classify_page_link, SAD_PANDA_BASE};
use crate::models::{PageLocator, Tag, TagCategory, TagMap};
use crate::schema::{attr, text_of, PageSchema};

const POSTED_LABEL: &str = "Posted:";
const LENGTH_LABEL: &str = "Length:";
const FAVORITED_LABEL: &str = "Favorited:";

/// Everything mined from a gallery's main page before the cover is downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedComic {
    pub main_title: String,
    pub sub_title: Option<String>,
    pub tags: TagMap,
    pub published_at: NaiveDateTime,
    pub page_count: u32,
    pub favorite_count: u32,
    pub cover_url: String,
}

/// The first listing page: where pagination ends plus its own thumbnails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedListing {
    pub last_page_index: u32,
    pub pages: Vec<PageLocator>,
}

fn cover_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"background:\s*transparent\s+url\(([^)]+)\)").expect("valid cover regex")
    })
}

/// Parse a gallery page into its metadata.
pub fn parse_comic_html(html: &str) -> Result<ParsedComic, ExtractError> {
    let document = Html::parse_document(html);
    let schema = PageSchema::get();

    // gm holds the titles, tags, side info and cover
    let top = schema.top_info(&document)?;
    // a gallery page always carries the pager and the thumbnail grid too
    schema.page_selector_bar(&document)?;
    schema.thumbnail_grid(&document)?;

    let main_title = text_of(schema.main_title(top)?);
    let sub_title = schema
        .sub_title(top)
        .map(text_of)
        .filter(|title| !title.trim().is_empty());

    let tags = parse_tags(schema, top)?;

    let side = schema.side_table(top)?;
    let published_at = parse_publish_date(&side_value(schema, side, POSTED_LABEL)?)?;
    let page_count = parse_count(&side_value(schema, side, LENGTH_LABEL)?, LENGTH_LABEL)?;
    let favorite_count =
        parse_count(&side_value(schema, side, FAVORITED_LABEL)?, FAVORITED_LABEL)?;

    let cover_url = parse_cover_url(schema, top)?;

    Ok(ParsedComic {
        main_title,
        sub_title,
        tags,
        published_at,
        page_count,
        favorite_count,
        cover_url,
    })
}

fn parse_tags(schema: &PageSchema, top: ElementRef<'_>) -> Result<TagMap, ExtractError> {
    let table = schema.tag_table(top)?;
    let mut tags = TagMap::new();

    for row in schema.tag_rows(table) {
        let label = text_of(schema.tag_category(row)?);
        let category = TagCategory::of(label.trim().trim_end_matches(':').trim());

        let row_tags: Vec<Tag> = schema
            .tag_anchors(row)
            .map(|a| Tag {
                category: category.clone(),
                name: text_of(a),
                link: a
                    .value()
                    .attr("href")
                    .map(str::trim)
                    .filter(|href| !href.is_empty())
                    .map(str::to_string),
            })
            .collect();

        tags.insert(category, row_tags);
    }

    Ok(tags)
}

/// Text of the cell right after the side-table cell containing `label`.
fn side_value(
    schema: &PageSchema,
    table: ElementRef<'_>,
    label: &'static str,
) -> Result<String, ExtractError> {
    schema
        .side_labels(table)
        .find(|cell| text_of(*cell).contains(label))
        .and_then(|cell| cell.next_siblings().find_map(ElementRef::wrap))
        .map(text_of)
        .ok_or(ExtractError::Missing { field: label })
}

fn parse_publish_date(text: &str) -> Result<NaiveDateTime, ExtractError> {
    let iso = text.trim().replace(' ', "T");
    NaiveDateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M"))
        .map_err(|e| ExtractError::malformed_by(format!("invalid publish date '{}'", text), e))
}

/// "28 pages" -> 28
fn parse_count(text: &str, label: &str) -> Result<u32, ExtractError> {
    let number = text.split(' ').next().unwrap_or_default();
    number.parse().map_err(|e| {
        ExtractError::malformed_by(format!("invalid value for '{}': '{}'", label, text), e)
    })
}

fn parse_cover_url(schema: &PageSchema, top: ElementRef<'_>) -> Result<String, ExtractError> {
    let style = attr(schema.cover_style(top)?, "style")?;
    cover_regex()
        .captures(style)
        .map(|caps| caps[1].trim().trim_matches(|c: char| c == '"' || c == '\'').to_string())
        .ok_or_else(|| ExtractError::malformed("could not find cover in style attribute"))
}

/// Parse the first listing page (the gallery page itself).
pub fn parse_listing_root(html: &str) -> Result<ParsedListing, ExtractError> {
    let document = Html::parse_document(html);
    let schema = PageSchema::get();

    let bar = schema.page_selector_bar(&document)?;
    let last_page_index = parse_last_page_index(schema, bar)?;
    let pages = parse_thumbnails(schema, &document, 0)?;

    Ok(ParsedListing {
        last_page_index,
        pages,
    })
}

/// Parse listing page `index` (1 and up).
pub fn parse_listing_page(html: &str, index: u32) -> Result<Vec<PageLocator>, ExtractError> {
    let document = Html::parse_document(html);
    parse_thumbnails(PageSchema::get(), &document, index)
}

/// The second-to-last page selector cell links to the last listing page.
fn parse_last_page_index(schema: &PageSchema, bar: ElementRef<'_>) -> Result<u32, ExtractError> {
    let cells = schema.page_selector_cells(bar);
    if cells.len() < 2 {
        return Err(ExtractError::Missing {
            field: "page selector (table.ptt)",
        });
    }
    let href = attr(schema.link(cells[cells.len() - 2])?, "href")?;

    let base = Url::parse(SAD_PANDA_BASE)
        .map_err(|e| ExtractError::malformed_by("invalid base url", e))?;
    let url = base
        .join(href)
        .map_err(|e| ExtractError::malformed_by(format!("invalid page selector link '{}'", href), e))?;

    // the first listing page carries no p parameter
    match url.query_pairs().find(|(key, _)| key == "p") {
        None => Ok(0),
        Some((_, value)) => value.parse().map_err(|e| {
            ExtractError::malformed_by(format!("invalid page index in '{}'", href), e)
        }),
    }
}

fn parse_thumbnails(
    schema: &PageSchema,
    document: &Html,
    index: u32,
) -> Result<Vec<PageLocator>, ExtractError> {
    let grid = schema.thumbnail_grid(document)?;
    schema
        .thumbnail_anchors(grid)
        .map(|a| -> Result<PageLocator, ExtractError> {
            let href = attr(a, "href")?;
            let (identifier, page_number) = classify_page_link(href).ok_or_else(|| {
                ExtractError::malformed(format!("Image href does not match regex. '{}'", href))
            })?;
            Ok(PageLocator {
                identifier,
                page_index: index,
                page_number,
            })
        })
        .collect()
}

/// Location of the full-size image on a page viewer document.
pub fn parse_page_image_url(html: &str) -> Result<String, ExtractError> {
    let document = Html::parse_document(html);
    let img = PageSchema::get().page_image(&document)?;
    let src = attr(img, "src")?.trim();
    if src.is_empty() {
        return Err(ExtractError::Missing { field: "src" });
    }
    Ok(src.to_string())
}
