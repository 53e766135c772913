//! Streaming query results.
//!
//! A [`Cursor`] is a lazy, forward-only sequence of documents. It can be consumed as a
//! [`futures::Stream`] or driven with [`Cursor::observe`], which delivers push-style
//! [`CursorEvent`]s: any number of `Data` events followed by exactly one of `Error` or
//! `Close`.
//!
//! The underlying backend stream is released as soon as the cursor is exhausted, fails,
//! is closed, or is dropped.
//!
//! ```ignore
//! let mut count = 0;
//! users.find_stream(doc! {}).await?.observe(|event| match event {
//!     CursorEvent::Data(_) => count += 1,
//!     CursorEvent::Error(err) => eprintln!("stream failed: {err}"),
//!     CursorEvent::Close => println!("read {count} users"),
//! }).await;
//! ```

use bson::Document as BsonDocument;
use futures::{Stream, StreamExt};
use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    backend::DocumentStream,
    error::{DocumentStoreError, DocumentStoreResult},
};

/// One signal delivered by [`Cursor::observe`].
#[derive(Debug)]
pub enum CursorEvent<T> {
    /// The next document.
    Data(T),
    /// The cursor failed; no further events follow.
    Error(DocumentStoreError),
    /// The cursor ended normally; no further events follow.
    Close,
}

type Decoder<T> = fn(BsonDocument) -> DocumentStoreResult<T>;

/// A lazy, forward-only, non-restartable sequence of query results.
pub struct Cursor<T> {
    stream: Option<DocumentStream>,
    decode: Decoder<T>,
    collection: String,
    yielded: usize,
}

impl<T> Cursor<T> {
    pub(crate) fn new(stream: DocumentStream, decode: Decoder<T>, collection: impl Into<String>) -> Self {
        Self {
            stream: Some(stream),
            decode,
            collection: collection.into(),
            yielded: 0,
        }
    }

    /// Name of the collection being read.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Number of documents yielded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Whether the cursor has ended (normally or with an error) or was closed.
    pub fn is_exhausted(&self) -> bool {
        self.stream.is_none()
    }

    /// Stops reading and releases the backend resources.
    pub fn close(mut self) {
        self.release("closed");
    }

    /// Drives the cursor to the end, delivering each document and then exactly one terminal
    /// event.
    ///
    /// Returns the number of `Data` events delivered.
    pub async fn observe(mut self, mut on_event: impl FnMut(CursorEvent<T>)) -> usize {
        let mut delivered = 0;

        while let Some(item) = self.next().await {
            match item {
                Ok(document) => {
                    delivered += 1;
                    on_event(CursorEvent::Data(document));
                }
                Err(err) => {
                    on_event(CursorEvent::Error(err));
                    return delivered;
                }
            }
        }

        on_event(CursorEvent::Close);
        delivered
    }

    fn release(&mut self, reason: &str) {
        if self.stream.take().is_some() {
            tracing::debug!(
                "Cursor on {} {} after {} documents",
                self.collection,
                reason,
                self.yielded
            );
        }
    }
}

impl<T> Stream for Cursor<T> {
    type Item = DocumentStoreResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        let Some(stream) = this.stream.as_mut() else {
            return Poll::Ready(None);
        };

        match stream.poll_next_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                this.release("exhausted");
                Poll::Ready(None)
            }
            Poll::Ready(Some(Ok(document))) => match (this.decode)(document) {
                Ok(value) => {
                    this.yielded += 1;
                    Poll::Ready(Some(Ok(value)))
                }
                Err(err) => {
                    this.release("failed");
                    Poll::Ready(Some(Err(err)))
                }
            },
            Poll::Ready(Some(Err(err))) => {
                this.release("failed");
                Poll::Ready(Some(Err(err)))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.stream {
            Some(stream) => (0, stream.size_hint().1),
            None => (0, Some(0)),
        }
    }
}

impl<T> Drop for Cursor<T> {
    fn drop(&mut self) {
        self.release("dropped");
    }
}

impl<T> fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("collection", &self.collection)
            .field("yielded", &self.yielded)
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}
