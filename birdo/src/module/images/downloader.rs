//! Image search + bulk download
//!
//! Scrapes an image-search results page for direct image links and saves
//! them into a species directory.

use anyhow::{Context, Result};
use async_trait::async_trait;
use birdo_common::SpeciesKey;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::fs;

use crate::config::ImageSearchConfig;

#[async_trait]
pub trait ImageDownloader: Send + Sync {
    /// Make sure `dir` holds up to `count` images for `key`.
    ///
    /// Creates `dir` when absent. Returns how many images the directory holds
    /// afterwards; any failure (network, no results) is an error.
    async fn download(&self, key: &SpeciesKey, count: usize, dir: &Path) -> Result<usize>;
}

fn image_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)https?://[^"'\s<>\\]+?\.(?:jpe?g|png|gif|bmp|webp)\b"#)
            .expect("image url pattern is valid")
    })
}

/// Collect direct image links from a search results page, first seen first.
///
/// Links embedded in page scripts are found by pattern; `<img>` tags
/// contribute their absolute `src`/`data-src` values.
pub fn extract_image_urls(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for m in image_url_regex().find_iter(html) {
        let url = m.as_str().to_string();
        if seen.insert(url.clone()) {
            urls.push(url);
        }
    }

    let document = Html::parse_document(html);
    if let Ok(selector) = Selector::parse("img") {
        for element in document.select(&selector) {
            for attr in ["data-src", "src"] {
                if let Some(value) = element.value().attr(attr) {
                    let value = value.trim();
                    if value.starts_with("http") && seen.insert(value.to_string()) {
                        urls.push(value.to_string());
                    }
                }
            }
        }
    }

    urls
}

/// File extension for a downloaded image, content type first
fn image_extension(content_type: Option<&str>, url: &str) -> Option<&'static str> {
    let from_type = content_type.and_then(|ct| {
        match ct.split(';').next().unwrap_or_default().trim() {
            "image/jpeg" | "image/jpg" => Some("jpg"),
            "image/png" => Some("png"),
            "image/gif" => Some("gif"),
            "image/bmp" => Some("bmp"),
            "image/webp" => Some("webp"),
            _ => None,
        }
    });
    if from_type.is_some() {
        return from_type;
    }

    let path = url.split(['?', '#']).next().unwrap_or_default().to_ascii_lowercase();
    ["jpg", "jpeg", "png", "gif", "bmp", "webp"]
        .into_iter()
        .find(|ext| path.ends_with(&format!(".{}", ext)))
        .map(|ext| if ext == "jpeg" { "jpg" } else { ext })
}

async fn count_files(dir: &Path) -> Result<usize> {
    let mut count = 0;
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}

/// First `<key>_<n>.<ext>` name not already taken in `dir`
fn next_free_path(dir: &Path, key: &SpeciesKey, start: usize, ext: &str) -> (PathBuf, usize) {
    let mut n = start;
    loop {
        let path = dir.join(format!("{}_{}.{}", key.as_str(), n, ext));
        if !path.exists() {
            return (path, n);
        }
        n += 1;
    }
}

/// Downloads from a Google-style image search page (`?q=...&tbm=isch`)
pub struct WebImageDownloader {
    client: Client,
    endpoint: String,
}

impl WebImageDownloader {
    pub fn new(config: &ImageSearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    async fn fetch_results_page(&self, key: &SpeciesKey) -> Result<String> {
        let url = format!(
            "{}?q={}&tbm=isch",
            self.endpoint,
            urlencoding::encode(&key.display_name())
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context(format!("Failed to search images for {}", key))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "HTTP error {} searching images for {}",
                response.status(),
                key
            ));
        }

        response
            .text()
            .await
            .context("Failed to read image search results")
    }

    /// Fetch one image; `None` if the response is not an image
    async fn fetch_image(&self, url: &str) -> Result<Option<(Vec<u8>, &'static str)>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow::anyhow!("HTTP error {}", response.status()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let Some(ext) = image_extension(content_type.as_deref(), url) else {
            return Ok(None);
        };

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some((bytes.to_vec(), ext)))
    }
}

#[async_trait]
impl ImageDownloader for WebImageDownloader {
    async fn download(&self, key: &SpeciesKey, count: usize, dir: &Path) -> Result<usize> {
        fs::create_dir_all(dir)
            .await
            .context(format!("Failed to create image directory: {:?}", dir))?;

        let mut saved = count_files(dir).await?;
        if saved >= count && saved > 0 {
            tracing::debug!("{} already has {} images, skipping download", key, saved);
            return Ok(saved);
        }

        let page = self.fetch_results_page(key).await?;
        let urls = extract_image_urls(&page);
        if urls.is_empty() {
            return Err(anyhow::anyhow!("No image results for {}", key));
        }
        tracing::debug!("Found {} image links for {}", urls.len(), key);

        let mut next_index = saved + 1;
        for url in urls {
            if saved >= count {
                break;
            }

            match self.fetch_image(&url).await {
                Ok(Some((bytes, ext))) => {
                    let (path, used) = next_free_path(dir, key, next_index, ext);
                    fs::write(&path, &bytes)
                        .await
                        .context(format!("Failed to write image {:?}", path))?;
                    next_index = used + 1;
                    saved += 1;
                    tracing::debug!("Saved {:?}", path);
                }
                Ok(None) => tracing::debug!("Skipping non-image response from {}", url),
                Err(e) => tracing::debug!("Failed to fetch {}: {}", url, e),
            }
        }

        if saved == 0 {
            return Err(anyhow::anyhow!("No images could be downloaded for {}", key));
        }

        Ok(saved)
    }
}
