//! Thin watch wrapper over the chunked HTTP watch endpoint.
//!
//! Deliberately kept outside the core: a line framed event stream plus a
//! reconnect loop. No informer cache, no resource version bookkeeping.

use std::pin::Pin;
use std::task::Context;
use std::task::Poll;
use std::time::Duration;

use bytes::Bytes;
use bytes::BytesMut;
use futures_util::stream::Stream;
use futures_util::StreamExt;
use http::Method;
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing::error;
use tracing::trace;

use os8_types::options::ListOptions;
use os8_types::HasIdentity;
use os8_types::WatchEvent;

use crate::client::CallParams;
use crate::client::K8Client;
use crate::exec::Call;
use crate::uri::collection_uri;
use crate::uri::label_selector;
use crate::Result;

/// frames an inner chunk stream into newline separated records
pub struct LineStream<S> {
    stream: S,
    buffer: BytesMut,
    done: bool,
}

impl<S> LineStream<S>
where
    S: Stream<Item = Result<Bytes, hyper::Error>> + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::new(),
            done: false,
        }
    }
}

impl<S> Stream for LineStream<S>
where
    S: Stream<Item = Result<Bytes, hyper::Error>> + Unpin,
{
    type Item = Bytes;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(pos) = this.buffer.iter().position(|byte| *byte == b'\n') {
                let mut line = this.buffer.split_to(pos + 1);
                line.truncate(pos);
                trace!(len = line.len(), "framed watch line");
                return Poll::Ready(Some(line.freeze()));
            }
            if this.done {
                if this.buffer.is_empty() {
                    return Poll::Ready(None);
                }
                let rest = this.buffer.split();
                return Poll::Ready(Some(rest.freeze()));
            }
            match Pin::new(&mut this.stream).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => this.done = true,
                Poll::Ready(Some(Ok(chunk))) => this.buffer.extend_from_slice(&chunk),
                Poll::Ready(Some(Err(err))) => {
                    error!("error reading watch chunk: {}", err);
                    this.done = true;
                }
            }
        }
    }
}

/// whether a watch loop keeps going after the handler saw an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchFlow {
    Continue,
    Stop,
}

impl K8Client {
    /// open one watch stream for resources matching the descriptor's
    /// namespace and labels. The stream ends when the server closes the
    /// connection; use [`watch_forever`](Self::watch_forever) for the
    /// reconnecting variant.
    pub async fn watch<K, R>(
        &self,
        resource: &R,
        params: &CallParams<'_>,
    ) -> Result<impl Stream<Item = Result<WatchEvent<K>>>>
    where
        R: HasIdentity + ?Sized,
        K: DeserializeOwned,
    {
        let labels = resource.labels();
        let query = ListOptions {
            watch: Some(true),
            label_selector: if labels.is_empty() {
                None
            } else {
                Some(label_selector(labels))
            },
            ..Default::default()
        };
        let path = format!(
            "{}?{}",
            collection_uri(resource).expand(),
            serde_qs::to_string(&query)?
        );

        let call = Call::new(Method::GET, path, format!("watch {}", resource.kind()))
            .token(params.token)
            .audience(params.audience);
        let body = self.executor.stream(&call).await?;

        Ok(LineStream::new(body).map(|line| {
            serde_json::from_slice::<WatchEvent<K>>(&line).map_err(|err| {
                error!("error decoding watch event: {}", err);
                error!("source: {}", String::from_utf8_lossy(&line));
                err.into()
            })
        }))
    }

    /// simple reconnect loop: reopen the stream whenever it ends or fails,
    /// until the handler returns [`WatchFlow::Stop`]. `types` optionally
    /// restricts which event types reach the handler.
    pub async fn watch_forever<K, R, F>(
        &self,
        resource: &R,
        types: &[&str],
        params: &CallParams<'_>,
        mut handler: F,
    ) -> Result<()>
    where
        R: HasIdentity + ?Sized,
        K: DeserializeOwned,
        F: FnMut(WatchEvent<K>) -> WatchFlow,
    {
        loop {
            debug!(kind = resource.kind(), "starting watch");
            let mut stream = match self.watch::<K, R>(resource, params).await {
                Ok(stream) => Box::pin(stream),
                Err(err) => {
                    error!("error opening watch: {}", err);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            while let Some(event) = stream.next().await {
                match event {
                    Ok(event) => {
                        if !types.is_empty() && !types.contains(&event.type_name()) {
                            continue;
                        }
                        if handler(event) == WatchFlow::Stop {
                            return Ok(());
                        }
                    }
                    Err(err) => {
                        error!("error in watch stream: {}", err);
                        break;
                    }
                }
            }
            debug!(kind = resource.kind(), "watch ended, reconnecting");
        }
    }
}

#[cfg(test)]
mod test {

    use bytes::Bytes;
    use futures_util::stream;
    use futures_util::StreamExt;

    use super::LineStream;

    fn chunks(parts: Vec<&'static str>) -> Vec<Result<Bytes, hyper::Error>> {
        parts.into_iter().map(|part| Ok(Bytes::from(part))).collect()
    }

    #[tokio::test]
    async fn test_reframes_split_lines() {
        let inner = stream::iter(chunks(vec!["{\"a\":", "1}\n{\"b\":2}\n{\"c\"", ":3}\n"]));
        let lines: Vec<_> = LineStream::new(inner).collect().await;
        assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}", "{\"c\":3}"]);
    }

    #[tokio::test]
    async fn test_trailing_partial_line_is_flushed() {
        let inner = stream::iter(chunks(vec!["{\"a\":1}\n{\"b\""]));
        let lines: Vec<_> = LineStream::new(inner).collect().await;
        assert_eq!(lines, vec!["{\"a\":1}", "{\"b\""]);
    }
}
