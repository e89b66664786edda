use std::sync::{Arc, RwLock};

use crate::config::SadPandaConfig;
use crate::error::SadPandaError;
use crate::extract;
use crate::fetcher::{SessionClient, Transport};
use crate::gallery::{GalleryId, SAD_PANDA_BASE};
use crate::models::{Comic, ImageContent, PageLocator};
use crate::upload::FileUploader;

enum State {
    /// No credentials were configured.
    Disabled,
    Enabled(Arc<dyn Transport>),
    Closed,
}

/// Scrapes galleries and re-hosts their images.
///
/// Safe to share between tasks; the only shared state is the transport, which
/// is cloned out of the lock before any request is made.
pub struct SadPandaController {
    state: RwLock<State>,
    uploader: Arc<dyn FileUploader>,
}

impl SadPandaController {
    /// Builds the session client right away when all cookies are configured.
    pub fn new(
        config: &SadPandaConfig,
        uploader: Arc<dyn FileUploader>,
    ) -> Result<Self, reqwest::Error> {
        match config.credentials() {
            Some(credentials) => {
                let client = SessionClient::new(&credentials)?;
                Ok(Self::with_transport(Arc::new(client), uploader))
            }
            None => Ok(Self::disabled(uploader)),
        }
    }

    pub fn disabled(uploader: Arc<dyn FileUploader>) -> Self {
        Self {
            state: RwLock::new(State::Disabled),
            uploader,
        }
    }

    pub fn with_transport(transport: Arc<dyn Transport>, uploader: Arc<dyn FileUploader>) -> Self {
        Self {
            state: RwLock::new(State::Enabled(transport)),
            uploader,
        }
    }

    /// True while credentials are configured and the controller is open; `close()` turns it off.
    pub fn can_scrape(&self) -> bool {
        matches!(
            *self.state.read().unwrap_or_else(|e| e.into_inner()),
            State::Enabled(_)
        )
    }

    fn transport(&self) -> Result<Arc<dyn Transport>, SadPandaError> {
        match &*self.state.read().unwrap_or_else(|e| e.into_inner()) {
            State::Enabled(transport) => Ok(Arc::clone(transport)),
            State::Disabled => Err(SadPandaError::Disabled),
            State::Closed => Err(SadPandaError::Closed),
        }
    }

    /// Scrape a gallery's metadata and download its cover.
    pub async fn get_comic(&self, id: &GalleryId) -> Result<Comic, SadPandaError> {
        let transport = self.transport()?;
        log::info!("Attempting to scrape '{}'.", id);

        let html = transport.get_text(&id.gallery_url(SAD_PANDA_BASE)).await?;
        let parsed = extract::parse_comic_html(&html).map_err(|e| e.into_scrape(id))?;

        log::info!("Downloading thumbnail cover for '{}' from '{}'.", id, parsed.cover_url);
        let cover = transport.get_bytes(&parsed.cover_url).await?;
        verify_image(id, &cover, &parsed.cover_url)?;

        Ok(Comic {
            id: id.clone(),
            main_title: parsed.main_title,
            sub_title: parsed.sub_title,
            tags: parsed.tags,
            cover: ImageContent::from_url(cover, &parsed.cover_url),
            published_at: parsed.published_at,
            page_count: parsed.page_count,
            favorite_count: parsed.favorite_count,
        })
    }

    /// Walk every listing page of a gallery, collecting its images in reading order.
    pub async fn get_comic_pages(&self, id: &GalleryId) -> Result<Vec<PageLocator>, SadPandaError> {
        let transport = self.transport()?;

        let html = transport.get_text(&id.gallery_url(SAD_PANDA_BASE)).await?;
        let root = extract::parse_listing_root(&html).map_err(|e| e.into_scrape(id))?;
        log::debug!("'{}' has {} listing pages", id, root.last_page_index + 1);

        let mut pages = root.pages;
        for index in 1..=root.last_page_index {
            let html = transport
                .get_text(&id.listing_url(SAD_PANDA_BASE, index))
                .await?;
            let listed = extract::parse_listing_page(&html, index).map_err(|e| e.into_scrape(id))?;
            pages.extend(listed);
        }

        Ok(pages)
    }

    /// Download the full-size image of page `page`.
    ///
    /// `id` is expected to carry the image token as hash, as produced by page links.
    pub async fn get_comic_page_contents(
        &self,
        id: &GalleryId,
        page: u32,
    ) -> Result<ImageContent, SadPandaError> {
        let transport = self.transport()?;

        let html = transport.get_text(&id.page_url(SAD_PANDA_BASE, page)).await?;
        let image_url = extract::parse_page_image_url(&html).map_err(|e| e.into_scrape(id))?;

        log::info!(
            "Download image from page '{}/{}-{}' with url {}.",
            id.hash(),
            id.id(),
            page,
            image_url
        );
        let content = transport.get_bytes(&image_url).await?;
        verify_image(id, &content, &image_url)?;

        Ok(ImageContent::from_url(content, &image_url))
    }

    /// Download page `page` and re-host it, returning the file host's URL.
    pub async fn get_comic_page(&self, id: &GalleryId, page: u32) -> Result<String, SadPandaError> {
        let contents = self.get_comic_page_contents(id, page).await?;
        log::info!(
            "Uploading image from page '{}/{}-{}' to the file host.",
            id.hash(),
            id.id(),
            page
        );
        let url = self.uploader.upload(contents.content, &contents.name).await?;
        Ok(url)
    }

    /// Drop the HTTP client. Idempotent, and a no-op when disabled.
    pub fn close(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if let State::Enabled(_) = *state {
            log::info!("Closing sad panda http client.");
            *state = State::Closed;
        }
    }
}

/// Reject bodies that are not an image, e.g. an HTML error page.
fn verify_image(id: &GalleryId, content: &[u8], url: &str) -> Result<(), SadPandaError> {
    image::guess_format(content).map(|_| ()).map_err(|e| SadPandaError::Scrape {
        id: id.clone(),
        message: format!("downloaded content from '{}' is not an image", url),
        cause: Some(Box::new(e)),
    })
}
