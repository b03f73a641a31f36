//! HTTP(S) mirror client.
//!
//! EMBL-EBI serves its FTP tree over HTTPS as plain index pages, so a
//! directory listing is the set of file links on the index page.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use evidex_common::{EvidexError, Result};
use scraper::{Html, Selector};
use tokio::io::AsyncWriteExt;
use tracing::info;
use url::Url;

use super::{finish_download, partial_path, FileServer};

#[derive(Debug, Clone)]
pub struct HttpFileServer {
    base: Url,
    client: reqwest::Client,
}

impl HttpFileServer {
    pub fn new(base: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("evidex/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EvidexError::Transfer(format!("could not build HTTP client: {e}")))?;
        Ok(Self { base, client })
    }

    fn dir_url(&self, remote_dir: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(&format!("{}/", remote_dir.trim_end_matches('/')));
        url
    }

    fn file_url(&self, remote_dir: &str, file_name: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(&format!("{}/{}", remote_dir.trim_end_matches('/'), file_name));
        url
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| EvidexError::Transfer(format!("{url}: {e}")))?;
        if !response.status().is_success() {
            return Err(EvidexError::Transfer(format!("{url}: HTTP {}", response.status())));
        }
        Ok(response)
    }

    async fn fetch_to(&self, url: &Url, path: &Path) -> Result<u64> {
        let mut response = self.get(url.clone()).await?;
        let mut file = tokio::fs::File::create(path).await?;
        let mut bytes = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| EvidexError::Transfer(format!("{url}: {e}")))?
        {
            file.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(bytes)
    }
}

/// File names linked from a directory index page.
///
/// Sub-directories, parent links, sort links and absolute links are skipped.
pub fn parse_listing(html: &str) -> Result<Vec<String>> {
    let selector = Selector::parse("a[href]")
        .map_err(|e| EvidexError::Transfer(format!("bad listing selector: {e}")))?;
    let document = Html::parse_document(html);

    let mut names: Vec<String> = document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| {
            !href.is_empty()
                && !href.starts_with('?')
                && !href.starts_with('/')
                && !href.starts_with('#')
                && !href.starts_with("..")
                && !href.ends_with('/')
                && !href.contains("://")
        })
        .map(str::to_string)
        .collect();
    names.dedup();
    Ok(names)
}

#[async_trait]
impl FileServer for HttpFileServer {
    fn address(&self) -> &str {
        self.base.as_str()
    }

    async fn list_dir(&self, remote_dir: &str) -> Result<Vec<String>> {
        let url = self.dir_url(remote_dir);
        let body = self
            .get(url.clone())
            .await?
            .text()
            .await
            .map_err(|e| EvidexError::Transfer(format!("{url}: {e}")))?;
        parse_listing(&body)
    }

    async fn download_file(&self, remote_dir: &str, file_name: &str, local_dir: &Path) -> Result<u64> {
        let url = self.file_url(remote_dir, file_name);
        info!(remote = %url, "Starting file download");

        let partial = partial_path(local_dir, file_name);
        let outcome = self.fetch_to(&url, &partial).await;
        let bytes = finish_download(&partial, &local_dir.join(file_name), outcome)?;

        info!(remote = %url, bytes, "Finished file download");
        Ok(bytes)
    }
}
