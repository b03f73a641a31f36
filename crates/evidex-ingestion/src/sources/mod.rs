//! Remote file server clients.

pub mod ftp;
pub mod http;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use evidex_common::{EvidexError, Result};
use url::Url;

pub use ftp::FtpFileServer;
pub use http::HttpFileServer;

/// Common interface for all file servers the pipeline can pull datasets from.
#[async_trait]
pub trait FileServer: Send + Sync {
    /// Server address, for logging.
    fn address(&self) -> &str;

    /// Names (without directory) of the files in `remote_dir`.
    async fn list_dir(&self, remote_dir: &str) -> Result<Vec<String>>;

    /// Copy `remote_dir/file_name` into `local_dir/file_name`.
    /// Returns the number of bytes written.
    async fn download_file(&self, remote_dir: &str, file_name: &str, local_dir: &Path) -> Result<u64>;
}

/// Where a download is written until it completes. The suffix keeps
/// unfinished files out of dataset loading, which only reads `*.json`.
pub(crate) fn partial_path(local_dir: &Path, file_name: &str) -> PathBuf {
    local_dir.join(format!("{file_name}.part"))
}

/// Move a finished download into place, or remove it if the transfer failed.
pub(crate) fn finish_download(partial: &Path, target: &Path, outcome: Result<u64>) -> Result<u64> {
    match outcome {
        Ok(bytes) => {
            std::fs::rename(partial, target)?;
            Ok(bytes)
        }
        Err(e) => {
            // The transfer error is the one worth reporting.
            let _ = std::fs::remove_file(partial);
            Err(e)
        }
    }
}

/// Pick a client from the server URL scheme.
///
/// `ftp://` uses [`FtpFileServer`], `http://` and `https://` use
/// [`HttpFileServer`]. A bare host name (`ftp.ebi.ac.uk`) is treated as FTP.
pub fn connect(server: &str) -> Result<Arc<dyn FileServer>> {
    let url = match Url::parse(server) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("ftp://{server}"))
            .map_err(|e| EvidexError::Config(format!("invalid server address {server:?}: {e}")))?,
        Err(e) => {
            return Err(EvidexError::Config(format!("invalid server address {server:?}: {e}")));
        }
    };

    match url.scheme() {
        "ftp" => Ok(Arc::new(FtpFileServer::from_url(&url)?)),
        "http" | "https" => Ok(Arc::new(HttpFileServer::new(url)?)),
        other => Err(EvidexError::Config(format!(
            "unsupported server scheme {other:?} (expected ftp, http or https)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_picks_backend_by_scheme() {
        assert_eq!(connect("ftp://ftp.ebi.ac.uk").unwrap().address(), "ftp.ebi.ac.uk:21");
        assert_eq!(connect("ftp.ebi.ac.uk").unwrap().address(), "ftp.ebi.ac.uk:21");
        assert_eq!(
            connect("https://ftp.ebi.ac.uk").unwrap().address(),
            "https://ftp.ebi.ac.uk/"
        );
    }

    #[test]
    fn test_finished_download_is_renamed_into_place() {
        let tmp = tempfile::tempdir().unwrap();
        let partial = partial_path(tmp.path(), "part-0.json");
        let target = tmp.path().join("part-0.json");
        std::fs::write(&partial, "{}\n").unwrap();

        assert_eq!(finish_download(&partial, &target, Ok(3)).unwrap(), 3);
        assert!(target.is_file());
        assert!(!partial.exists());
    }

    #[test]
    fn test_failed_download_leaves_nothing_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let partial = partial_path(tmp.path(), "part-0.json");
        let target = tmp.path().join("part-0.json");
        std::fs::write(&partial, "{\"targetId\":").unwrap();

        let outcome = Err(EvidexError::Transfer("connection reset".into()));
        let err = finish_download(&partial, &target, outcome).unwrap_err();

        assert!(matches!(err, EvidexError::Transfer(_)));
        assert!(!partial.exists());
        assert!(!target.exists());
    }

    #[test]
    fn test_connect_rejects_unknown_scheme() {
        assert!(matches!(connect("sftp://example.org"), Err(EvidexError::Config(_))));
    }
}
