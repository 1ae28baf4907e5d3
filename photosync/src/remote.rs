//! Boundary between the sync engine and the remote photo library.
//!
//! The engine only sees [`RemoteItem`] values and the [`RemoteLibrary`]
//! trait; [`PhotoLibraryRemote`] adapts the HTTP client from
//! `photosync-core` to that shape.

use std::future::Future;
use std::io;

use futures_util::TryStreamExt;
use photosync_core::{ApiErrorClass, Photo, PhotoLibraryClient, PhotoLibraryError};
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

const LISTING_PAGE_SIZE: u32 = 100;

/// Byte stream of one item's content.
pub type ContentStream = Box<dyn AsyncRead + Send + Unpin>;

/// Opaque token the remote side uses to locate an item's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHandle(String);

impl ContentHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    /// Filename relative to the destination directory.
    pub name: String,
    /// Size announced by the listing. Advisory only.
    pub size: u64,
    pub handle: ContentHandle,
}

impl RemoteItem {
    pub fn new(name: impl Into<String>, size: u64, handle: ContentHandle) -> Self {
        Self {
            name: name.into(),
            size,
            handle,
        }
    }
}

impl From<Photo> for RemoteItem {
    fn from(photo: Photo) -> Self {
        Self {
            name: photo.filename,
            size: photo.size,
            handle: ContentHandle::new(photo.id),
        }
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote session expired: {0}")]
    AuthExpired(String),
    #[error("transient remote failure: {0}")]
    Transient(String),
    #[error("remote request failed: {0}")]
    Other(String),
}

impl From<PhotoLibraryError> for RemoteError {
    fn from(err: PhotoLibraryError) -> Self {
        match err.classification() {
            Some(ApiErrorClass::Auth) => RemoteError::AuthExpired(err.to_string()),
            Some(ApiErrorClass::Transient | ApiErrorClass::RateLimit) => {
                RemoteError::Transient(err.to_string())
            }
            Some(ApiErrorClass::Permanent) | None => RemoteError::Other(err.to_string()),
        }
    }
}

pub trait RemoteLibrary: Send + Sync {
    /// Lists every item the remote side currently holds, in its own order.
    fn list_items(&self) -> impl Future<Output = Result<Vec<RemoteItem>, RemoteError>> + Send;

    fn open_content(
        &self,
        item: &RemoteItem,
    ) -> impl Future<Output = Result<ContentStream, RemoteError>> + Send;
}

pub struct PhotoLibraryRemote {
    client: PhotoLibraryClient,
    page_size: u32,
}

impl PhotoLibraryRemote {
    pub fn new(client: PhotoLibraryClient) -> Self {
        Self {
            client,
            page_size: LISTING_PAGE_SIZE,
        }
    }
}

impl RemoteLibrary for PhotoLibraryRemote {
    async fn list_items(&self) -> Result<Vec<RemoteItem>, RemoteError> {
        let photos = self.client.list_all_photos(self.page_size).await?;
        Ok(photos.into_iter().map(RemoteItem::from).collect())
    }

    async fn open_content(&self, item: &RemoteItem) -> Result<ContentStream, RemoteError> {
        let response = self.client.open_original(item.handle.as_str()).await?;
        Ok(body_reader(response))
    }
}

fn body_reader(response: reqwest::Response) -> ContentStream {
    let stream = response.bytes_stream().map_err(io::Error::other);
    Box::new(StreamReader::new(Box::pin(stream)))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    /// In-memory library used by engine tests.
    #[derive(Default)]
    pub(crate) struct FakeLibrary {
        items: Vec<(RemoteItem, Vec<u8>)>,
        refuse_open: HashSet<String>,
        break_stream: HashSet<String>,
        stall_stream: HashSet<String>,
        expire_on_open: HashSet<String>,
        listing_error: Option<fn() -> RemoteError>,
        opened: Mutex<Vec<String>>,
    }

    impl FakeLibrary {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_item(mut self, name: &str, content: &[u8]) -> Self {
            let size = content.len() as u64;
            self.items.push((
                RemoteItem::new(name, size, ContentHandle::new(format!("id-{name}"))),
                content.to_vec(),
            ));
            self
        }

        pub(crate) fn with_declared_item(mut self, name: &str, declared: u64, content: &[u8]) -> Self {
            self.items.push((
                RemoteItem::new(name, declared, ContentHandle::new(format!("id-{name}"))),
                content.to_vec(),
            ));
            self
        }

        pub(crate) fn refusing(mut self, name: &str) -> Self {
            self.refuse_open.insert(name.to_string());
            self
        }

        pub(crate) fn breaking(mut self, name: &str) -> Self {
            self.break_stream.insert(name.to_string());
            self
        }

        /// Opening `name` fails as if the session had expired.
        pub(crate) fn expiring(mut self, name: &str) -> Self {
            self.expire_on_open.insert(name.to_string());
            self
        }

        /// Content of `name` never produces a byte.
        pub(crate) fn stalling(mut self, name: &str) -> Self {
            self.stall_stream.insert(name.to_string());
            self
        }

        pub(crate) fn failing_listing(mut self, make: fn() -> RemoteError) -> Self {
            self.listing_error = Some(make);
            self
        }

        pub(crate) fn listing(&self) -> Vec<RemoteItem> {
            self.items.iter().map(|(item, _)| item.clone()).collect()
        }

        pub(crate) fn opened(&self) -> Vec<String> {
            self.opened.lock().unwrap().clone()
        }
    }

    impl RemoteLibrary for FakeLibrary {
        async fn list_items(&self) -> Result<Vec<RemoteItem>, RemoteError> {
            if let Some(make) = self.listing_error {
                return Err(make());
            }
            Ok(self.listing())
        }

        async fn open_content(&self, item: &RemoteItem) -> Result<ContentStream, RemoteError> {
            self.opened.lock().unwrap().push(item.name.clone());
            if self.expire_on_open.contains(&item.name) {
                return Err(RemoteError::AuthExpired("401 Unauthorized".to_string()));
            }
            if self.refuse_open.contains(&item.name) {
                return Err(RemoteError::Transient(format!("cannot open {}", item.name)));
            }
            let content = self
                .items
                .iter()
                .find(|(candidate, _)| candidate.handle == item.handle)
                .map(|(_, content)| content.clone())
                .ok_or_else(|| RemoteError::Other(format!("unknown item {}", item.name)))?;
            if self.stall_stream.contains(&item.name) {
                let pending = futures_util::stream::pending::<io::Result<&'static [u8]>>();
                return Ok(Box::new(StreamReader::new(pending)));
            }
            if self.break_stream.contains(&item.name) {
                let chunks: Vec<io::Result<&'static [u8]>> = vec![
                    Ok(&b"partial"[..]),
                    Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
                ];
                return Ok(Box::new(StreamReader::new(futures_util::stream::iter(chunks))));
            }
            Ok(Box::new(std::io::Cursor::new(content)))
        }
    }
}
