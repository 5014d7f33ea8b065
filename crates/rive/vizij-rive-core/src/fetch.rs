//! Fetching file bytes for URL sources.

use async_trait::async_trait;

use crate::{Result, RiveError};

/// Resolves a `src` URL into file bytes.
#[async_trait]
pub trait Fetch: Send + Sync + 'static {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Reads `file://` URLs and plain paths from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileFetcher;

impl FileFetcher {
    fn path_of(url: &str) -> Result<&str> {
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(path);
        }
        match url.split_once("://") {
            Some((scheme, _)) => Err(RiveError::Fetch {
                url: url.to_string(),
                reason: format!("unsupported scheme '{scheme}'"),
            }),
            None => Ok(url),
        }
    }
}

#[async_trait]
impl Fetch for FileFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let path = Self::path_of(url)?;
        tokio::fs::read(path).await.map_err(|err| RiveError::Fetch {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_file_scheme_and_rejects_others() {
        assert_eq!(FileFetcher::path_of("file:///tmp/a.riv").unwrap(), "/tmp/a.riv");
        assert_eq!(FileFetcher::path_of("assets/a.riv").unwrap(), "assets/a.riv");
        let err = FileFetcher::path_of("https://cdn.example.com/a.riv").unwrap_err();
        assert!(matches!(err, RiveError::Fetch { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_a_fetch_error() {
        let err = FileFetcher
            .fetch("file:///definitely/not/here.riv")
            .await
            .unwrap_err();
        assert_eq!(err.category(), "runtime");
    }
}
