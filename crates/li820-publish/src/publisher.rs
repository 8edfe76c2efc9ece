use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use li820_transport::{Endpoint, EndpointListener, SubscriberStream};
use tracing::{debug, info, warn};

use crate::error::{PublishError, Result};

/// How long one subscriber may stall a publish before it is dropped.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

const ACCEPT_THREAD_NAME: &str = "li820-accept";
const ACCEPT_ERROR_PAUSE: Duration = Duration::from_millis(100);

type Subscribers = Arc<Mutex<Vec<SubscriberStream>>>;

/// Fans newline-delimited payloads out to every connected subscriber.
///
/// Each bound endpoint gets an accept thread that adds new subscribers. A
/// subscriber whose write fails or times out is dropped.
pub struct Publisher {
    subscribers: Subscribers,
    endpoints: Vec<Endpoint>,
}

impl Publisher {
    /// Bind every endpoint with [`DEFAULT_WRITE_TIMEOUT`].
    pub fn bind(endpoints: &[Endpoint]) -> Result<Self> {
        Self::bind_with_timeout(endpoints, DEFAULT_WRITE_TIMEOUT)
    }

    /// Bind every endpoint and start accepting subscribers.
    pub fn bind_with_timeout(endpoints: &[Endpoint], write_timeout: Duration) -> Result<Self> {
        let subscribers: Subscribers = Arc::default();
        let mut bound = Vec::with_capacity(endpoints.len());

        for endpoint in endpoints {
            let listener = EndpointListener::bind(endpoint)?;
            bound.push(listener.endpoint().clone());

            let subscribers = Arc::clone(&subscribers);
            thread::Builder::new()
                .name(ACCEPT_THREAD_NAME.to_string())
                .spawn(move || accept_loop(listener, subscribers, write_timeout))
                .map_err(|source| PublishError::Spawn {
                    name: ACCEPT_THREAD_NAME,
                    source,
                })?;
        }

        Ok(Self {
            subscribers,
            endpoints: bound,
        })
    }

    /// Write `payload` plus a newline to every subscriber.
    ///
    /// Returns how many subscribers received it. Writes happen outside the
    /// subscriber lock, so a stalled subscriber delays only this call (by at
    /// most the write timeout) and never the accept threads. Subscribers
    /// accepted meanwhile start with the next payload. Expects a single
    /// publishing thread.
    pub fn publish(&self, payload: &str) -> usize {
        let mut line = Vec::with_capacity(payload.len() + 1);
        line.extend_from_slice(payload.as_bytes());
        line.push(b'\n');

        let mut current = std::mem::take(&mut *lock(&self.subscribers));
        current.retain_mut(|subscriber| match subscriber.write_all(&line) {
            Ok(()) => true,
            Err(err) => {
                warn!(peer = subscriber.peer(), error = %err, "dropping subscriber");
                false
            }
        });
        let delivered = current.len();

        let mut subscribers = lock(&self.subscribers);
        current.append(&mut subscribers);
        *subscribers = current;
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    /// Endpoints as bound; TCP port 0 shows the port actually assigned.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("endpoints", &self.endpoints)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

fn lock(subscribers: &Subscribers) -> MutexGuard<'_, Vec<SubscriberStream>> {
    // A panic while holding the lock leaves the list itself intact.
    subscribers.lock().unwrap_or_else(PoisonError::into_inner)
}

fn accept_loop(listener: EndpointListener, subscribers: Subscribers, write_timeout: Duration) {
    let endpoint = listener.endpoint().to_string();
    loop {
        match listener.accept() {
            Ok(subscriber) => {
                if let Err(err) = subscriber.set_write_timeout(Some(write_timeout)) {
                    warn!(peer = subscriber.peer(), error = %err, "rejecting subscriber");
                    continue;
                }
                info!(peer = subscriber.peer(), %endpoint, "subscriber connected");
                lock(&subscribers).push(subscriber);
            }
            Err(err) => {
                debug!(%endpoint, error = %err, "accept failed");
                thread::sleep(ACCEPT_ERROR_PAUSE);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader};
    use std::time::Instant;

    use super::*;

    fn wait_for_subscribers(publisher: &Publisher, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while publisher.subscriber_count() < count {
            assert!(Instant::now() < deadline, "subscriber never registered");
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn tcp_addr(publisher: &Publisher) -> String {
        match &publisher.endpoints()[0] {
            Endpoint::Tcp(addr) => addr.clone(),
            other => panic!("expected tcp endpoint, got {other}"),
        }
    }

    #[test]
    fn tcp_subscriber_receives_lines_in_order() {
        let publisher = Publisher::bind(&[Endpoint::Tcp("127.0.0.1:0".into())]).unwrap();
        let subscriber = SubscriberStream::connect_tcp(&tcp_addr(&publisher)).unwrap();
        wait_for_subscribers(&publisher, 1);

        assert_eq!(publisher.publish(r#"{"co2":1.0}"#), 1);
        assert_eq!(publisher.publish(r#"{"co2":2.0}"#), 1);

        let mut lines = BufReader::new(subscriber).lines();
        assert_eq!(lines.next().unwrap().unwrap(), r#"{"co2":1.0}"#);
        assert_eq!(lines.next().unwrap().unwrap(), r#"{"co2":2.0}"#);
    }

    #[cfg(unix)]
    #[test]
    fn ipc_subscriber_receives_lines() {
        let dir = std::env::temp_dir().join(format!("li820-pub-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("weather.ipc");

        let publisher = Publisher::bind(&[Endpoint::Ipc(path.clone())]).unwrap();
        let subscriber = li820_transport::UnixDomainSocket::connect(&path).unwrap();
        wait_for_subscribers(&publisher, 1);

        publisher.publish("hello");
        let mut line = String::new();
        BufReader::new(subscriber).read_line(&mut line).unwrap();
        assert_eq!(line, "hello\n");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn closed_subscriber_is_dropped() {
        let publisher = Publisher::bind(&[Endpoint::Tcp("127.0.0.1:0".into())]).unwrap();
        let subscriber = SubscriberStream::connect_tcp(&tcp_addr(&publisher)).unwrap();
        wait_for_subscribers(&publisher, 1);
        drop(subscriber);

        // The first write after a close may still succeed locally.
        let deadline = Instant::now() + Duration::from_secs(5);
        while publisher.publish("ping") > 0 {
            assert!(Instant::now() < deadline, "closed subscriber was never dropped");
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn stalled_subscriber_does_not_block_accepts() {
        let publisher = Arc::new(
            Publisher::bind_with_timeout(
                &[Endpoint::Tcp("127.0.0.1:0".into())],
                Duration::from_secs(3),
            )
            .unwrap(),
        );
        let addr = tcp_addr(&publisher);
        let _stalled = SubscriberStream::connect_tcp(&addr).unwrap();
        wait_for_subscribers(&publisher, 1);

        // Far more than the socket buffers hold, and never read.
        let payload = "x".repeat(32 * 1024 * 1024);
        let publishing = {
            let publisher = Arc::clone(&publisher);
            thread::spawn(move || publisher.publish(&payload))
        };
        thread::sleep(Duration::from_millis(200));

        let started = Instant::now();
        let _late = SubscriberStream::connect_tcp(&addr).unwrap();
        wait_for_subscribers(&publisher, 1);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!publishing.is_finished());

        assert_eq!(publishing.join().unwrap(), 0);
        assert_eq!(publisher.subscriber_count(), 1);
    }

    #[test]
    fn no_endpoints_publishes_to_nobody() {
        let publisher = Publisher::bind(&[]).unwrap();
        assert_eq!(publisher.publish("{}"), 0);
        assert!(publisher.endpoints().is_empty());
    }
}
