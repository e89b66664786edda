//! Structural layout of the gallery site's pages.
//!
//! Every CSS path used to mine a document lives here, behind named accessors,
//! so a markup change on the site only has to be followed in this module.

use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

use crate::error::ExtractError;

/// Outcome of looking up a required node.
pub type Lookup<'a> = Result<ElementRef<'a>, ExtractError>;

pub struct PageSchema {
    // gallery page sections
    top_info: Selector,
    page_selector_bar: Selector,
    thumbnail_grid: Selector,
    // inside top_info
    main_title: Selector,
    sub_title: Selector,
    tag_table: Selector,
    tag_row: Selector,
    tag_category: Selector,
    tag_anchor: Selector,
    side_info: Selector,
    side_table: Selector,
    side_label: Selector,
    cover_style: Selector,
    // pagination
    page_selector_cell: Selector,
    link: Selector,
    thumbnail_anchor: Selector,
    // page viewer
    page_image: Selector,
}

fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector '{css}': {e:?}"))
}

impl PageSchema {
    pub fn get() -> &'static PageSchema {
        static SCHEMA: OnceLock<PageSchema> = OnceLock::new();
        SCHEMA.get_or_init(|| PageSchema {
            top_info: sel("body > div.gm"),
            page_selector_bar: sel("body > div.gtb"),
            thumbnail_grid: sel("body > div#gdt"),
            main_title: sel("div#gd2 > h1#gn"),
            sub_title: sel("div#gd2 > h1#gj"),
            tag_table: sel("div#gmid > div#gd4 > div#taglist > table > tbody"),
            tag_row: sel("tr"),
            tag_category: sel("td.tc"),
            tag_anchor: sel("td > div[id] > a[id]"),
            side_info: sel("div#gd3"),
            side_table: sel("div#gdd > table > tbody"),
            side_label: sel("tr > td.gdt1"),
            cover_style: sel("div#gleft > div#gd1 > div[style]"),
            page_selector_cell: sel("table.ptt > tbody > tr > td"),
            link: sel("a[href]"),
            thumbnail_anchor: sel("div.gdtm > div > a[href]"),
            page_image: sel("body > div#i1 > div#i3 > a[href] > img#img"),
        })
    }

    pub fn top_info<'a>(&self, doc: &'a Html) -> Lookup<'a> {
        first(doc.root_element(), &self.top_info, "body > div.gm")
    }

    pub fn page_selector_bar<'a>(&self, doc: &'a Html) -> Lookup<'a> {
        first(doc.root_element(), &self.page_selector_bar, "body > div.gtb")
    }

    pub fn thumbnail_grid<'a>(&self, doc: &'a Html) -> Lookup<'a> {
        first(doc.root_element(), &self.thumbnail_grid, "body > div#gdt")
    }

    pub fn main_title<'a>(&self, top: ElementRef<'a>) -> Lookup<'a> {
        first(top, &self.main_title, "main title (h1#gn)")
    }

    /// Optional; absent on galleries without a secondary title.
    pub fn sub_title<'a>(&self, top: ElementRef<'a>) -> Option<ElementRef<'a>> {
        top.select(&self.sub_title).next()
    }

    pub fn tag_table<'a>(&self, top: ElementRef<'a>) -> Lookup<'a> {
        first(top, &self.tag_table, "tag list (div#taglist)")
    }

    pub fn tag_rows<'a>(&self, table: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        table.select(&Self::get().tag_row)
    }

    pub fn tag_category<'a>(&self, row: ElementRef<'a>) -> Lookup<'a> {
        first(row, &self.tag_category, "tag category (td.tc)")
    }

    pub fn tag_anchors<'a>(&self, row: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        row.select(&Self::get().tag_anchor)
    }

    pub fn side_table<'a>(&self, top: ElementRef<'a>) -> Lookup<'a> {
        let side = first(top, &self.side_info, "side info (div#gd3)")?;
        first(side, &self.side_table, "side info table (div#gdd)")
    }

    pub fn side_labels<'a>(&self, table: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        table.select(&Self::get().side_label)
    }

    pub fn cover_style<'a>(&self, top: ElementRef<'a>) -> Lookup<'a> {
        first(top, &self.cover_style, "cover (div#gd1 > div[style])")
    }

    pub fn page_selector_cells<'a>(&self, bar: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        bar.select(&self.page_selector_cell).collect()
    }

    pub fn link<'a>(&self, node: ElementRef<'a>) -> Lookup<'a> {
        first(node, &self.link, "link (a[href])")
    }

    pub fn thumbnail_anchors<'a>(&self, grid: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        grid.select(&Self::get().thumbnail_anchor)
    }

    pub fn page_image<'a>(&self, doc: &'a Html) -> Lookup<'a> {
        first(doc.root_element(), &self.page_image, "page image (div#i3 > a > img#img)")
    }
}

fn first<'a>(node: ElementRef<'a>, selector: &Selector, field: &'static str) -> Lookup<'a> {
    node.select(selector)
        .next()
        .ok_or(ExtractError::Missing { field })
}

/// Whitespace-normalised text content of `node`.
pub fn text_of(node: ElementRef<'_>) -> String {
    node.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn attr<'a>(node: ElementRef<'a>, name: &'static str) -> Result<&'a str, ExtractError> {
    node.value()
        .attr(name)
        .ok_or(ExtractError::Missing { field: name })
}
