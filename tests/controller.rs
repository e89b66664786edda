use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use humbaba_lib::config::SadPandaConfig;
use humbaba_lib::controller::SadPandaController;
use humbaba_lib::error::{FetchError, SadPandaError, UploadError};
use humbaba_lib::fetcher::Transport;
use humbaba_lib::gallery::GalleryId;
use humbaba_lib::upload::FileUploader;

const GALLERY_HTML: &str = include_str!("fixtures/gallery.html");
const LISTING_P1_HTML: &str = include_str!("fixtures/listing_p1.html");
const LISTING_P2_HTML: &str = include_str!("fixtures/listing_p2.html");
const PAGE_HTML: &str = include_str!("fixtures/page.html");

const GALLERY_URL: &str = "https://exhentai.org/g/2230000/a1b2c3d4e5/";
const COVER_URL: &str = "https://ehgt.org/w/01/234/cover.png";
const PAGE_URL: &str = "https://exhentai.org/s/0f1e2d3c4b/2230000-3";
const IMAGE_URL: &str = "https://abcd.hath.network:8443/h/0123/keystamp=1/003.png";
const UPLOADED_URL: &str = "https://files.catbox.moe/x1y2z3.png";

fn png(marker: u8) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec();
    bytes.push(marker);
    bytes
}

/// Serves canned documents and records every URL requested.
#[derive(Default)]
struct FixtureTransport {
    texts: HashMap<String, String>,
    bytes: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl FixtureTransport {
    fn with_text(mut self, url: &str, html: &str) -> Self {
        self.texts.insert(url.to_string(), html.to_string());
        self
    }

    fn with_bytes(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.bytes.insert(url.to_string(), bytes);
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.texts.get(url).cloned().ok_or(FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.bytes.get(url).cloned().ok_or(FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

#[derive(Default)]
struct RecordingUploader {
    uploads: Mutex<Vec<(Vec<u8>, String)>>,
}

#[async_trait]
impl FileUploader for RecordingUploader {
    async fn upload(&self, content: Vec<u8>, file_name: &str) -> Result<String, UploadError> {
        self.uploads
            .lock()
            .unwrap()
            .push((content, file_name.to_string()));
        Ok(UPLOADED_URL.to_string())
    }
}

struct RejectingUploader;

#[async_trait]
impl FileUploader for RejectingUploader {
    async fn upload(&self, _content: Vec<u8>, file_name: &str) -> Result<String, UploadError> {
        Err(UploadError::InvalidResponse {
            file_name: file_name.to_string(),
            body: "<html>502</html>".to_string(),
        })
    }
}

struct PanickingUploader;

#[async_trait]
impl FileUploader for PanickingUploader {
    async fn upload(&self, _content: Vec<u8>, _file_name: &str) -> Result<String, UploadError> {
        panic!("uploader must not be called");
    }
}

fn gallery_id() -> GalleryId {
    GalleryId::new("2230000", "a1b2c3d4e5").unwrap()
}

fn page_id() -> GalleryId {
    GalleryId::new("2230000", "0f1e2d3c4b").unwrap()
}

fn controller(transport: FixtureTransport) -> (SadPandaController, Arc<FixtureTransport>) {
    let transport = Arc::new(transport);
    let controller = SadPandaController::with_transport(
        transport.clone(),
        Arc::new(PanickingUploader),
    );
    (controller, transport)
}

fn gallery_transport(html: &str) -> FixtureTransport {
    FixtureTransport::default()
        .with_text(GALLERY_URL, html)
        .with_bytes(COVER_URL, png(1))
}

#[tokio::test]
async fn get_comic_scrapes_all_metadata() {
    let (controller, transport) = controller(gallery_transport(GALLERY_HTML));

    let comic = controller.get_comic(&gallery_id()).await.unwrap();

    assert_eq!(comic.id, gallery_id());
    assert_eq!(comic.main_title, "Sample Gallery");
    assert_eq!(comic.sub_title.as_deref(), Some("サンプル"));
    assert_eq!(comic.page_count, 84);
    assert_eq!(comic.favorite_count, 1234);
    assert_eq!(comic.published_at_utc().to_rfc3339(), "2022-05-30T12:34:00+00:00");
    assert_eq!(comic.url(), GALLERY_URL);
    assert_eq!(comic.cover.name, "cover.png");
    assert_eq!(comic.cover.content, png(1));

    assert_eq!(comic.tags.len(), 2);
    let female = comic.tags.get("female").unwrap();
    assert_eq!(female.len(), 1);
    assert_eq!(female[0].name, "tag1");
    assert_eq!(female[0].link, None);
    let other = comic.tags.get("other").unwrap();
    assert_eq!(other[0].name, "tag2");
    assert_eq!(other[0].link.as_deref(), Some("http://x"));

    assert_eq!(transport.requests(), [GALLERY_URL, COVER_URL]);
}

#[tokio::test]
async fn missing_cover_style_is_a_scrape_error() {
    let html = GALLERY_HTML.replace(
        r#"<div style="width:250px; height:354px; background:transparent url(https://ehgt.org/w/01/234/cover.png) no-repeat"></div>"#,
        "<div></div>",
    );
    let (controller, transport) = controller(gallery_transport(&html));

    match controller.get_comic(&gallery_id()).await {
        Err(SadPandaError::Scrape { id, message, .. }) => {
            assert_eq!(id, gallery_id());
            assert!(message.contains("cover"), "{message}");
        }
        other => panic!("expected a scrape error, got {other:?}"),
    }
    // the cover is never requested
    assert_eq!(transport.requests(), [GALLERY_URL]);
}

#[tokio::test]
async fn cover_style_without_url_is_a_scrape_error() {
    let html = GALLERY_HTML.replace("background:transparent url(https://ehgt.org/w/01/234/cover.png)", "");
    let (controller, _) = controller(gallery_transport(&html));

    let err = controller.get_comic(&gallery_id()).await.unwrap_err();
    assert!(err.to_string().contains("could not find cover in style attribute"), "{err}");
}

#[tokio::test]
async fn missing_title_is_a_scrape_error() {
    let html = GALLERY_HTML.replace(r#"<h1 id="gn">Sample Gallery</h1>"#, "");
    let (controller, _) = controller(gallery_transport(&html));

    match controller.get_comic(&gallery_id()).await {
        Err(SadPandaError::Scrape { message, .. }) => assert!(message.contains("title"), "{message}"),
        other => panic!("expected a scrape error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_image_cover_is_rejected() {
    let transport = FixtureTransport::default()
        .with_text(GALLERY_URL, GALLERY_HTML)
        .with_bytes(COVER_URL, b"<html>509</html>".to_vec());
    let (controller, _) = controller(transport);

    let err = controller.get_comic(&gallery_id()).await.unwrap_err();
    assert!(matches!(err, SadPandaError::Scrape { .. }));
    assert!(err.to_string().contains("not an image"), "{err}");
}

#[tokio::test]
async fn unreachable_gallery_is_a_fetch_error() {
    let (controller, _) = controller(FixtureTransport::default());

    let err = controller.get_comic(&gallery_id()).await.unwrap_err();
    assert!(matches!(
        err,
        SadPandaError::Fetch(FetchError::Status { status: 404, .. })
    ));
}

#[tokio::test]
async fn pagination_walks_every_listing_page_in_order() {
    let transport = FixtureTransport::default()
        .with_text(GALLERY_URL, GALLERY_HTML)
        .with_text(&format!("{GALLERY_URL}?p=1"), LISTING_P1_HTML)
        .with_text(&format!("{GALLERY_URL}?p=2"), LISTING_P2_HTML);
    let (controller, transport) = controller(transport);

    let pages = controller.get_comic_pages(&gallery_id()).await.unwrap();

    assert_eq!(
        transport.requests(),
        [
            GALLERY_URL.to_string(),
            format!("{GALLERY_URL}?p=1"),
            format!("{GALLERY_URL}?p=2"),
        ]
    );

    let order: Vec<_> = pages
        .iter()
        .map(|p| (p.page_index, p.page_number, p.identifier.hash().to_string()))
        .collect();
    assert_eq!(
        order,
        [
            (0, 1, "aaaaaaaaaa".to_string()),
            (0, 2, "bbbbbbbbbb".to_string()),
            (1, 41, "cccccccccc".to_string()),
            (1, 42, "dddddddddd".to_string()),
            (2, 81, "eeeeeeeeee".to_string()),
        ]
    );
    assert!(pages.iter().all(|p| p.identifier.id() == "2230000"));
    assert_eq!(
        pages[2].page_url("https://exhentai.org"),
        "https://exhentai.org/s/cccccccccc/2230000-41"
    );
}

#[tokio::test]
async fn malformed_thumbnail_link_aborts_pagination() {
    let broken = LISTING_P1_HTML.replace("https://exhentai.org/s/cccccccccc/2230000-41", "/broken");
    let transport = FixtureTransport::default()
        .with_text(GALLERY_URL, GALLERY_HTML)
        .with_text(&format!("{GALLERY_URL}?p=1"), &broken)
        .with_text(&format!("{GALLERY_URL}?p=2"), LISTING_P2_HTML);
    let (controller, transport) = controller(transport);

    let err = controller.get_comic_pages(&gallery_id()).await.unwrap_err();
    assert!(err.to_string().contains("/broken"), "{err}");
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn page_contents_are_downloaded_from_the_viewer() {
    let transport = FixtureTransport::default()
        .with_text(PAGE_URL, PAGE_HTML)
        .with_bytes(IMAGE_URL, png(3));
    let (controller, transport) = controller(transport);

    let contents = controller.get_comic_page_contents(&page_id(), 3).await.unwrap();

    assert_eq!(contents.name, "003.png");
    assert_eq!(contents.content, png(3));
    assert_eq!(transport.requests(), [PAGE_URL, IMAGE_URL]);
}

#[tokio::test]
async fn page_without_image_is_a_scrape_error() {
    let transport = FixtureTransport::default().with_text(PAGE_URL, "<html><body><div id=\"i1\"></div></body></html>");
    let (controller, _) = controller(transport);

    let err = controller.get_comic_page_contents(&page_id(), 3).await.unwrap_err();
    assert!(matches!(err, SadPandaError::Scrape { .. }));
}

#[tokio::test]
async fn get_comic_page_passes_content_through_the_uploader() {
    let transport = Arc::new(
        FixtureTransport::default()
            .with_text(PAGE_URL, PAGE_HTML)
            .with_bytes(IMAGE_URL, png(3)),
    );
    let uploader = Arc::new(RecordingUploader::default());
    let controller = SadPandaController::with_transport(transport, uploader.clone());

    let contents = controller.get_comic_page_contents(&page_id(), 3).await.unwrap();
    let url = controller.get_comic_page(&page_id(), 3).await.unwrap();

    assert_eq!(url, UPLOADED_URL);
    let uploads = uploader.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, contents.content);
    assert_eq!(uploads[0].1, contents.name);
}

#[tokio::test]
async fn upload_failures_are_propagated_unchanged() {
    let transport = Arc::new(
        FixtureTransport::default()
            .with_text(PAGE_URL, PAGE_HTML)
            .with_bytes(IMAGE_URL, png(3)),
    );
    let controller = SadPandaController::with_transport(transport, Arc::new(RejectingUploader));

    let err = controller.get_comic_page(&page_id(), 3).await.unwrap_err();
    assert!(matches!(
        err,
        SadPandaError::Upload(UploadError::InvalidResponse { .. })
    ));
}

#[tokio::test]
async fn missing_credentials_disable_every_operation() {
    let config = SadPandaConfig {
        igneous: Some("ig".to_string()),
        ipb_member_id: None,
        ipb_pass_hash: Some("hash".to_string()),
    };
    let controller = SadPandaController::new(&config, Arc::new(PanickingUploader)).unwrap();
    assert!(!controller.can_scrape());

    assert!(matches!(
        controller.get_comic(&gallery_id()).await,
        Err(SadPandaError::Disabled)
    ));
    assert!(matches!(
        controller.get_comic_pages(&gallery_id()).await,
        Err(SadPandaError::Disabled)
    ));
    assert!(matches!(
        controller.get_comic_page_contents(&page_id(), 1).await,
        Err(SadPandaError::Disabled)
    ));
    assert!(matches!(
        controller.get_comic_page(&page_id(), 1).await,
        Err(SadPandaError::Disabled)
    ));

    controller.close();
    controller.close();
    assert!(matches!(
        controller.get_comic(&gallery_id()).await,
        Err(SadPandaError::Disabled)
    ));
}

#[tokio::test]
async fn full_credentials_enable_scraping() {
    let config = SadPandaConfig {
        igneous: Some("ig".to_string()),
        ipb_member_id: Some("42".to_string()),
        ipb_pass_hash: Some("hash".to_string()),
    };
    let controller = SadPandaController::new(&config, Arc::new(PanickingUploader)).unwrap();
    assert!(controller.can_scrape());
}

#[tokio::test]
async fn closed_controller_stops_without_network() {
    let (controller, transport) = controller(gallery_transport(GALLERY_HTML));
    assert!(controller.can_scrape());

    controller.close();
    controller.close();

    assert!(!controller.can_scrape());
    assert!(matches!(
        controller.get_comic(&gallery_id()).await,
        Err(SadPandaError::Closed)
    ));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn concurrent_calls_share_one_transport() {
    let (controller, transport) = controller(gallery_transport(GALLERY_HTML));
    let controller = Arc::new(controller);

    let first = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.get_comic(&gallery_id()).await }
    });
    let second = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.get_comic(&gallery_id()).await }
    });

    let (first, second) = (first.await.unwrap().unwrap(), second.await.unwrap().unwrap());
    assert_eq!(first, second);
    assert_eq!(transport.requests().len(), 4);
}
