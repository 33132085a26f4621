//! Listener proxy
//!
//! A TCP-level load balancer in front of an exported listener. Incoming
//! connections are dealt round-robin over a mutable backend set; bytes are
//! shuttled both ways until either side closes. Backends are only ever
//! added; replica membership is monotonic for the deployment's lifetime.

use crate::shutdown::Shutdown;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::copy_bidirectional;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

/// A proxy over one exported listener.
#[derive(Debug)]
pub struct Proxy {
    /// Listener name, carried for logging only.
    name: String,
    backends: Mutex<Vec<String>>,
    next: AtomicUsize,
}

impl Proxy {
    pub fn new(name: &str) -> Self {
        Proxy {
            name: name.to_string(),
            backends: Mutex::new(Vec::new()),
            next: AtomicUsize::new(0),
        }
    }

    /// Add a backend address. Re-adding an existing backend is a no-op, so
    /// retried export requests stay idempotent.
    pub fn add_backend(&self, addr: &str) {
        let mut backends = self.lock_backends();
        if backends.iter().any(|b| b == addr) {
            return;
        }
        backends.push(addr.to_string());
        debug!(
            target: "brood::proxy",
            listener = %self.name,
            backend = %addr,
            backend_count = backends.len(),
            "Backend added"
        );
    }

    /// Current backend set, in insertion order.
    pub fn backends(&self) -> Vec<String> {
        self.lock_backends().clone()
    }

    /// Pick the next backend round-robin. `None` when no backend exists.
    fn pick(&self) -> Option<String> {
        let backends = self.lock_backends();
        if backends.is_empty() {
            return None;
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % backends.len();
        Some(backends[idx].clone())
    }

    fn lock_backends(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.backends.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Accept connections until shutdown, forwarding each to a backend on
    /// its own task.
    pub async fn serve(self: Arc<Self>, listener: TcpListener, shutdown: Shutdown) {
        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => return,
                accepted = listener.accept() => accepted,
            };
            let (inbound, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(target: "brood::proxy", listener = %self.name, error = %e, "Accept failed");
                    continue;
                }
            };
            let Some(backend) = self.pick() else {
                debug!(target: "brood::proxy", listener = %self.name, "No backend, dropping connection");
                continue;
            };
            let proxy = self.clone();
            tokio::spawn(async move {
                if let Err(e) = proxy.forward(inbound, &backend).await {
                    debug!(
                        target: "brood::proxy",
                        listener = %proxy.name,
                        backend = %backend,
                        peer = %peer,
                        error = %e,
                        "Connection closed with error"
                    );
                }
            });
        }
    }

    async fn forward(&self, mut inbound: TcpStream, backend: &str) -> std::io::Result<()> {
        let mut outbound = TcpStream::connect(backend).await?;
        copy_bidirectional(&mut inbound, &mut outbound).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_add_backend_is_idempotent() {
        let proxy = Proxy::new("web");
        proxy.add_backend("10.0.0.1:81");
        proxy.add_backend("10.0.0.1:81");
        proxy.add_backend("10.0.0.2:81");
        assert_eq!(proxy.backends(), vec!["10.0.0.1:81", "10.0.0.2:81"]);
    }

    #[test]
    fn test_round_robin_cycles_backends() {
        let proxy = Proxy::new("web");
        proxy.add_backend("a");
        proxy.add_backend("b");
        let picks: Vec<String> = (0..4).map(|_| proxy.pick().unwrap()).collect();
        assert_eq!(picks, vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn test_pick_with_no_backends() {
        let proxy = Proxy::new("web");
        assert_eq!(proxy.pick(), None);
    }

    #[tokio::test]
    async fn test_forwards_bytes_to_backend() {
        // Echo backend.
        let backend = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let backend_addr = backend.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut conn, _) = backend.accept().await.unwrap();
            let mut buf = [0u8; 5];
            conn.read_exact(&mut buf).await.unwrap();
            conn.write_all(&buf).await.unwrap();
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let proxy_addr = listener.local_addr().unwrap();
        let proxy = Arc::new(Proxy::new("echo"));
        proxy.add_backend(&backend_addr);
        let shutdown = Shutdown::new();
        tokio::spawn(proxy.serve(listener, shutdown.clone()));

        let mut client = TcpStream::connect(proxy_addr).await.unwrap();
        client.write_all(b"hello").await.unwrap();
        let mut reply = [0u8; 5];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply, b"hello");

        shutdown.trigger();
    }
}
