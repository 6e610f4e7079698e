//! Signature/photo retrieval. Fetch failures never propagate: a missing image
//! becomes a placeholder cell, not an aborted report.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// How the PDF writer embeds an image.
#[derive(Clone, Debug)]
pub(crate) enum Encoding {
    /// Baseline JPEG passed through as a DCT stream.
    Dct { gray: bool },
    /// Decoded pixels, written as Flate RGB plus an optional alpha mask.
    Rgba(image::RgbaImage),
}

#[derive(Clone, Debug)]
pub struct LoadedImage {
    /// Bytes as fetched; the DOCX writer stores these verbatim.
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub(crate) encoding: Encoding,
}

struct Sniffed {
    width: u32,
    height: u32,
    format: ImageFormat,
    components: u8,
}

/// Sniff JPEG/PNG headers for format and pixel size.
fn image_dimensions(data: &[u8]) -> Option<Sniffed> {
    // JPEG: starts with FF D8
    if data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8 {
        let mut i = 2;
        while i + 4 < data.len() {
            if data[i] != 0xFF {
                return None;
            }
            let marker = data[i + 1];
            if marker == 0xD9 {
                break;
            }
            let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            if (marker == 0xC0 || marker == 0xC1 || marker == 0xC2) && i + 9 < data.len() {
                let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
                let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
                return Some(Sniffed {
                    width,
                    height,
                    format: ImageFormat::Jpeg,
                    components: data[i + 9],
                });
            }
            i += 2 + len;
        }
        return None;
    }

    // PNG: starts with 89 50 4E 47, dimensions in IHDR chunk at bytes 16-23
    if data.len() >= 24 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
    {
        let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
        let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
        return Some(Sniffed {
            width,
            height,
            format: ImageFormat::Png,
            components: 0,
        });
    }

    None
}

impl LoadedImage {
    /// Validate and prepare fetched bytes. PNGs and non-RGB JPEGs are decoded
    /// here so that a corrupt image is rejected before layout, not while writing.
    pub fn from_bytes(data: Vec<u8>) -> Option<Self> {
        let sniffed = image_dimensions(&data)?;
        if sniffed.width == 0 || sniffed.height == 0 {
            return None;
        }
        let encoding = match (sniffed.format, sniffed.components) {
            (ImageFormat::Jpeg, 1) => Encoding::Dct { gray: true },
            (ImageFormat::Jpeg, 3) => Encoding::Dct { gray: false },
            (format, _) => {
                let hint = match format {
                    ImageFormat::Jpeg => image::ImageFormat::Jpeg,
                    ImageFormat::Png => image::ImageFormat::Png,
                };
                match image::load_from_memory_with_format(&data, hint) {
                    Ok(decoded) => Encoding::Rgba(decoded.to_rgba8()),
                    Err(e) => {
                        log::error!("Failed to decode {format:?} image: {e}");
                        return None;
                    }
                }
            }
        };
        Some(Self {
            data,
            format: sniffed.format,
            pixel_width: sniffed.width,
            pixel_height: sniffed.height,
            encoding,
        })
    }

    /// Largest `(w, h)` with this image's aspect ratio that fits the box.
    pub fn fit_within(&self, max_w: f32, max_h: f32) -> (f32, f32) {
        let aspect = self.pixel_width as f32 / self.pixel_height as f32;
        if max_w / max_h > aspect {
            (max_h * aspect, max_h)
        } else {
            (max_w, max_w / aspect)
        }
    }
}

#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Raw bytes for `url`, or `None` on any failure.
    async fn fetch(&self, url: &str) -> Option<Vec<u8>>;
}

pub struct HttpImageFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl ImageSource for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        let response = match self.client.get(url).timeout(self.timeout).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                log::error!("Image fetch timed out after {:?}: {url}", self.timeout);
                return None;
            }
            Err(e) => {
                log::error!("Image fetch failed for {url}: {e}");
                return None;
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            log::warn!("Image not found (404): {url}");
            return None;
        }
        if !status.is_success() {
            log::error!("Image fetch for {url} returned status {}", status.as_u16());
            return None;
        }

        match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                log::error!("Image body read failed for {url}: {e}");
                None
            }
        }
    }
}

/// Images prefetched for one document, keyed by URL. A `None` entry is a URL
/// whose fetch or decode failed.
#[derive(Default)]
pub struct ImageStore {
    images: BTreeMap<String, Option<LoadedImage>>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &str, image: Option<LoadedImage>) {
        self.images.insert(url.to_string(), image);
    }

    /// `None` when the URL was never fetched or its fetch failed.
    pub fn get(&self, url: &str) -> Option<&LoadedImage> {
        self.images.get(url).and_then(|img| img.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LoadedImage)> {
        self.images
            .iter()
            .filter_map(|(url, img)| img.as_ref().map(|i| (url.as_str(), i)))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Fetch every URL concurrently, each under the source's own timeout.
    /// Drawing starts only after this returns.
    pub async fn prefetch<S: ImageSource + ?Sized>(source: &S, urls: &[String]) -> Self {
        let fetched = join_all(urls.iter().map(|url| async move {
            let image = source.fetch(url).await.and_then(|bytes| {
                let loaded = LoadedImage::from_bytes(bytes);
                if loaded.is_none() {
                    log::error!("Image at {url} is not a PNG or JPEG");
                }
                loaded
            });
            (url.clone(), image)
        }))
        .await;

        let mut store = Self::new();
        for (url, image) in fetched {
            store.images.insert(url, image);
        }
        store
    }
}
