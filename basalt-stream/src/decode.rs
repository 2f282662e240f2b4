//! Top-level stream driver: bytes → lines → SSE events → `StreamEvent`s,
//! with cancellation, overall timeout, heartbeat, and a bounded,
//! drop-oldest event queue (spec §4.1 "Concurrency contract",
//! "Cancellation", "Timeout & heartbeat").

use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use basalt_types::StreamError;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::event::StreamEvent;
use crate::line_decoder::LineDecoder;
use crate::reducer::Reducer;
use crate::sse::SseLineDecoder;

/// Maximum number of undelivered events buffered between the decoder and
/// its consumer before the oldest is dropped (spec §4.1).
pub const EVENT_QUEUE_CAPACITY: usize = 100;

/// Tuning knobs for one decoding run.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Cooperative cancellation signal.
    pub cancellation: CancellationToken,
    /// Hard ceiling on total decode time.
    pub overall_timeout: Option<Duration>,
    /// Fire a heartbeat if no bytes arrive for this long.
    pub heartbeat_idle: Option<Duration>,
    /// Treat sustained idleness past this threshold as a fatal timeout.
    pub heartbeat_timeout: Option<Duration>,
}

/// Decode a byte stream (typically an HTTP response body) into a stream of
/// `StreamEvent`s. Decoding runs eagerly on a background task regardless of
/// how quickly the returned stream is polled, so a slow consumer sees
/// dropped events rather than backpressure on the network read.
pub fn decode_stream<S, E>(
    byte_stream: S,
    opts: DecodeOptions,
) -> impl Stream<Item = StreamEvent> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let queue = Arc::new(EventQueue::new());
    let driver_queue = queue.clone();
    tokio::spawn(async move {
        drive(byte_stream, opts, driver_queue).await;
    });

    async_stream::stream! {
        while let Some(event) = queue.pop().await {
            yield event;
        }
    }
}

async fn drive<S, E>(byte_stream: S, opts: DecodeOptions, queue: Arc<EventQueue>)
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let mut stream = std::pin::pin!(byte_stream);
    let mut line_dec = LineDecoder::new();
    let mut sse_dec = SseLineDecoder::new();
    let mut reducer = Reducer::new();

    let start = tokio::time::Instant::now();
    let mut last_byte = tokio::time::Instant::now();

    loop {
        if opts.cancellation.is_cancelled() {
            queue.push(StreamEvent::Abort);
            break;
        }
        if let Some(overall) = opts.overall_timeout {
            if start.elapsed() >= overall {
                queue.push(StreamEvent::Error(StreamError::UnexpectedEof));
                break;
            }
        }

        let idle_sleep = match opts.heartbeat_idle {
            Some(idle) => tokio::time::sleep_until(last_byte + idle),
            None => tokio::time::sleep(Duration::from_secs(u32::MAX as u64)),
        };

        tokio::select! {
            biased;
            () = opts.cancellation.cancelled() => {
                queue.push(StreamEvent::Abort);
                break;
            }
            () = idle_sleep, if opts.heartbeat_idle.is_some() => {
                queue.push(StreamEvent::Heartbeat);
                if let Some(hb_timeout) = opts.heartbeat_timeout {
                    if last_byte.elapsed() >= hb_timeout {
                        queue.push(StreamEvent::Error(StreamError::UnexpectedEof));
                        break;
                    }
                }
            }
            item = stream.next() => {
                match item {
                    None => {
                        if let Some(line) = line_dec.finish() {
                            if let Some(raw) = sse_dec.push_line(&line) {
                                for ev in reducer.apply(&raw) {
                                    queue.push(ev);
                                }
                            }
                        }
                        break;
                    }
                    Some(Err(e)) => {
                        queue.push(StreamEvent::Error(StreamError::MalformedEvent(e.to_string())));
                        break;
                    }
                    Some(Ok(bytes)) => {
                        last_byte = tokio::time::Instant::now();
                        let mut fatal = false;
                        for line in line_dec.push(&bytes) {
                            if let Some(raw) = sse_dec.push_line(&line) {
                                for ev in reducer.apply(&raw) {
                                    fatal = fatal || matches!(ev, StreamEvent::Error(_));
                                    queue.push(ev);
                                }
                            }
                        }
                        if fatal || reducer.is_ended() {
                            break;
                        }
                    }
                }
            }
        }
    }
    queue.close();
}

/// A bounded, drop-oldest-on-overflow event queue shared between the
/// background decode task and the consumer-facing stream.
struct EventQueue {
    inner: Mutex<VecDeque<StreamEvent>>,
    notify: Notify,
    closed: AtomicBool,
}

impl EventQueue {
    fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(EVENT_QUEUE_CAPACITY)),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn push(&self, event: StreamEvent) {
        {
            let mut queue = self.inner.lock().expect("event queue mutex poisoned");
            if queue.len() >= EVENT_QUEUE_CAPACITY {
                queue.pop_front();
                tracing::warn!("stream event queue overflowed capacity {EVENT_QUEUE_CAPACITY}, dropped oldest event");
            }
            queue.push_back(event);
        }
        self.notify.notify_one();
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    async fn pop(&self) -> Option<StreamEvent> {
        loop {
            {
                let mut queue = self.inner.lock().expect("event queue mutex poisoned");
                if let Some(event) = queue.pop_front() {
                    return Some(event);
                }
                if self.closed.load(Ordering::SeqCst) {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
        stream::iter(parts.iter().map(|p| Ok(Bytes::from(p.as_bytes().to_vec()))).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn decodes_a_simple_text_stream() {
        let sse = "event: content_block_start\ndata: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\nevent: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\nevent: message_stop\ndata: {\"type\":\"message_stop\"}\n\n";
        let events: Vec<StreamEvent> = decode_stream(chunks(&[sse]), DecodeOptions::default())
            .collect()
            .await;
        assert!(events.iter().any(|e| matches!(e, StreamEvent::Text { delta, .. } if delta == "Hi")));
        assert!(events.iter().any(|e| matches!(e, StreamEvent::MessageStop(_))));
    }

    #[tokio::test]
    async fn cancellation_emits_abort_and_stops() {
        let token = CancellationToken::new();
        token.cancel();
        let opts = DecodeOptions {
            cancellation: token,
            ..Default::default()
        };
        let events: Vec<StreamEvent> = decode_stream(chunks(&["event: ping\ndata: {}\n\n"]), opts)
            .collect()
            .await;
        assert!(matches!(events.as_slice(), [StreamEvent::Abort]));
    }

    #[test]
    fn event_queue_drops_oldest_on_overflow() {
        let queue = EventQueue::new();
        for _ in 0..EVENT_QUEUE_CAPACITY + 10 {
            queue.push(StreamEvent::Heartbeat);
        }
        assert_eq!(queue.inner.lock().unwrap().len(), EVENT_QUEUE_CAPACITY);
    }
}
