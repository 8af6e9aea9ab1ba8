//! Async stream of text deltas from the tutor chat endpoint.

use crate::sse::{DeltaParser, StreamItem};
use futures_core::Stream;
use pin_project_lite::pin_project;
use sensei_types::ChatError;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// An async stream of text deltas decoded from a chunked HTTP body.
    ///
    /// Each stream owns its parser state; concurrent calls never share a
    /// buffer. The stream terminates on the `[DONE]` sentinel, on end of
    /// input (after a final parser flush), or on the first transport
    /// error.
    pub struct ChatStream {
        #[pin]
        inner: Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>,
        parser: DeltaParser,
        queued: VecDeque<StreamItem>,
        input_finished: bool,
        terminal: bool,
    }
}

impl ChatStream {
    /// Create a ChatStream from a reqwest byte stream.
    pub fn new(
        byte_stream: impl Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            parser: DeltaParser::new(),
            queued: VecDeque::new(),
            input_finished: false,
            terminal: false,
        }
    }
}

impl Stream for ChatStream {
    type Item = Result<String, ChatError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if *this.terminal {
                return Poll::Ready(None);
            }

            if let Some(item) = this.queued.pop_front() {
                match item {
                    StreamItem::Delta(text) => return Poll::Ready(Some(Ok(text))),
                    StreamItem::Done => {
                        *this.terminal = true;
                        return Poll::Ready(None);
                    }
                }
            }

            if *this.input_finished {
                *this.terminal = true;
                return Poll::Ready(None);
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.queued.extend(this.parser.feed(&bytes));
                }
                Poll::Ready(Some(Err(e))) => {
                    *this.terminal = true;
                    return Poll::Ready(Some(Err(ChatError::Connection {
                        message: e.to_string(),
                    })));
                }
                Poll::Ready(None) => {
                    this.queued.extend(this.parser.finish());
                    *this.input_finished = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
