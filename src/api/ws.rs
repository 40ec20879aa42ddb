// =============================================================================
// WebSocket Server — subscriber transport
// =============================================================================
//
// Accepts subscriber connections (over TLS when an identity is configured)
// and bridges each socket to the broadcast scheduler:
//   1. On connect a `SubscriberHandle` is created and reported as a
//      `Connected` event; the scheduler registers it and pushes a fresh
//      analysis to it.
//   2. Payloads queued on the handle are written to the socket as text
//      frames.
//   3. Inbound text frames are reported as `Message` events.
//   4. On close, read error, or write error the connection reports
//      `Disconnected`.
//
// A failing connection only ends its own task; the accept loop keeps going.
// =============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio_native_tls::TlsAcceptor;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::broadcast::{BroadcastScheduler, SubscriberEvent, SubscriberHandle};

/// Upper bound on the TLS and WebSocket handshakes of one connection.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after a failed `accept()` (e.g. EMFILE) before retrying.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

// =============================================================================
// Accept loop
// =============================================================================

/// Accept subscribers on `listener` until the task is dropped.
pub async fn run_ws_server(
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    scheduler: Arc<BroadcastScheduler>,
) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "failed to accept TCP connection");
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };

        let tls = tls.clone();
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            if let Err(e) =
                accept_connection(stream, peer, tls, scheduler, HANDSHAKE_TIMEOUT).await
            {
                warn!(peer = %peer, error = %e, "subscriber connection failed");
            }
        });
    }
}

async fn accept_connection(
    stream: TcpStream,
    peer: SocketAddr,
    tls: Option<TlsAcceptor>,
    scheduler: Arc<BroadcastScheduler>,
    handshake_timeout: Duration,
) -> Result<()> {
    match tls {
        Some(acceptor) => {
            let stream = tokio::time::timeout(handshake_timeout, acceptor.accept(stream))
                .await
                .context("TLS handshake timed out")?
                .context("TLS handshake failed")?;
            serve_connection(stream, peer, scheduler, handshake_timeout).await
        }
        None => serve_connection(stream, peer, scheduler, handshake_timeout).await,
    }
}

// =============================================================================
// Connection handler
// =============================================================================

/// Run one subscriber connection to completion.
async fn serve_connection<S>(
    stream: S,
    peer: SocketAddr,
    scheduler: Arc<BroadcastScheduler>,
    handshake_timeout: Duration,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let ws = tokio::time::timeout(handshake_timeout, tokio_tungstenite::accept_async(stream))
        .await
        .context("WebSocket handshake timed out")?
        .context("WebSocket handshake failed")?;
    info!(peer = %peer, "subscriber connected");

    let (mut sender, mut receiver) = ws.split();
    let (handle, mut outbound) = SubscriberHandle::new(peer.to_string());
    let id = handle.id();
    scheduler.handle_event(SubscriberEvent::Connected(handle));

    loop {
        tokio::select! {
            // ── Outbound: payloads queued by the scheduler ──────────────
            payload = outbound.recv() => {
                let Some(payload) = payload else {
                    // Registry dropped this handle after a failed delivery.
                    debug!(id = %id, "subscriber queue closed");
                    break;
                };
                if let Err(e) = sender.send(Message::Text(payload.to_string())).await {
                    debug!(id = %id, error = %e, "WebSocket send failed — disconnecting");
                    break;
                }
                debug!(id = %id, bytes = payload.len(), "payload sent");
            }

            // ── Inbound: client frames ──────────────────────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        scheduler.handle_event(SubscriberEvent::Message { id, text });
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!(id = %id, "WebSocket Close frame received — disconnecting");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Ping replies are queued by tungstenite itself.
                    }
                    Some(Err(e)) => {
                        warn!(id = %id, error = %e, "WebSocket receive error — disconnecting");
                        break;
                    }
                    None => {
                        info!(id = %id, "WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    scheduler.handle_event(SubscriberEvent::Disconnected(id));
    let _ = sender.close().await;
    info!(peer = %peer, "subscriber disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::SubscriberRegistry;
    use crate::market_data::{Candle, MarketDataSource};
    use async_trait::async_trait;
    use tokio::time::timeout;
    use tokio_tungstenite::connect_async;

    struct StaticSource;

    #[async_trait]
    impl MarketDataSource for StaticSource {
        async fn fetch_candles(&self, _lookback_minutes: u32) -> Result<Vec<Candle>> {
            Ok((0..30)
                .map(|i| {
                    let p = 50.0 + i as f64;
                    Candle::new(i * 60_000, p, p + 1.0, p - 1.0, p + 0.5, 2.0)
                })
                .collect())
        }

        fn describe(&self) -> String {
            "static".into()
        }
    }

    #[tokio::test]
    async fn subscriber_receives_initial_push_and_is_unregistered_on_close() {
        let registry = Arc::new(SubscriberRegistry::new());
        let scheduler = Arc::new(BroadcastScheduler::new(
            Arc::new(StaticSource),
            registry.clone(),
            Duration::from_secs(3600),
            60,
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(run_ws_server(listener, None, scheduler.clone()));

        let (mut client, _) = connect_async(format!("ws://{addr}")).await.unwrap();
        let first = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("initial push timed out")
            .expect("stream ended")
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 30);
        assert_eq!(registry.len(), 1);

        client.send(Message::Text("ping from client".into())).await.unwrap();
        scheduler.publish().await;
        let second = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("publish timed out")
            .expect("stream ended")
            .unwrap();
        assert!(second.is_text());

        client.close(None).await.unwrap();
        timeout(Duration::from_secs(5), async {
            while !registry.is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("subscriber was not unregistered");

        server.abort();
    }

    #[tokio::test]
    async fn silent_peer_is_dropped_after_handshake_timeout() {
        let registry = Arc::new(SubscriberRegistry::new());
        let scheduler = Arc::new(BroadcastScheduler::new(
            Arc::new(StaticSource),
            registry.clone(),
            Duration::from_secs(3600),
            60,
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Opens the TCP connection and never sends the upgrade request.
        let _silent = TcpStream::connect(addr).await.unwrap();
        let (stream, peer) = listener.accept().await.unwrap();

        let err = timeout(
            Duration::from_secs(5),
            accept_connection(stream, peer, None, scheduler, Duration::from_millis(50)),
        )
        .await
        .expect("handshake was not bounded")
        .unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
        assert!(registry.is_empty());
    }
}
