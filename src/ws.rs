// src/ws.rs

use std::{future::Future, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use bytes::Bytes;
use fastwebsockets::{FragmentCollector, OpCode};
use http::Uri;
use http_body_util::Empty;
use hyper::{
    header::{CONNECTION, HOST, UPGRADE},
    upgrade::Upgraded,
    Request,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio_rustls::{
    rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore, ServerName},
    TlsConnector,
};
use tracing::{debug, error, info, warn};

use crate::reader::{now_ms, FeedHandler, ReaderStats};


/// Runs one upstream session to completion, feeding every data frame to `handler`.
///
/// - Connects over TLS for `wss://` and plain TCP for `ws://`
/// - Timestamps each text frame as soon as it is read; binary frames are skipped
/// - Ends on a close frame or the first transport error, without reconnecting
///
/// Connection failures are logged with the reader id and never propagated.
pub async fn start_ws_reader(uri: String, mut handler: FeedHandler) -> ReaderStats {
    let id = handler.id();

    let mut ws = match connect(&uri).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("[Client {}] Connection error: {:#}", id, e);
            return handler.stats();
        }
    };
    info!("[Client {}] Connection opened.", id);

    loop {
        let frame = match ws.read_frame().await {
            Ok(frame) => frame,
            Err(e) => {
                warn!("[Client {}] Websocket error: {}", id, e);
                break;
            }
        };

        match frame.opcode {
            OpCode::Text => {
                let receive_ts_ms = now_ms();
                handler.on_message(&frame.payload, receive_ts_ms);
            }
            OpCode::Close => break,
            OpCode::Binary => {
                debug!("[Client {}] Ignoring binary frame of {} bytes", id, frame.payload.len());
            }
            _ => {
                // Ping/pong are answered by fastwebsockets
            }
        }
    }

    info!("[Client {}] Connection closed.", id);
    handler.stats()
}

/// Basic executor required by hyper handshake for spawning background tasks.
struct SpawnExecutor;

impl <Fut> hyper::rt::Executor<Fut> for SpawnExecutor
    where
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        fn execute(&self, fut: Fut) {
            tokio::task::spawn(fut);
        }
    }

/// Configures the TLS connector using the bundled webpki trust roots.
fn tls_connector() -> TlsConnector {
    let mut root_store = RootCertStore::empty();

    root_store.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.0.iter().map(
        |ta| {
          OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
          )
        },
      ));

    // Safe defaults negotiate TLS 1.2 or 1.3 only.
    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

/// Where to connect and what to put on the request line for a stream URI.
#[derive(Debug, PartialEq, Eq)]
struct Endpoint {
    secure: bool,
    host: String,
    addr: String,
    path: String,
}

fn endpoint(uri: &str) -> Result<Endpoint> {
    let uri: Uri = uri.parse().with_context(|| format!("invalid uri '{uri}'"))?;

    let secure = match uri.scheme_str() {
        Some("wss") => true,
        Some("ws") => false,
        other => bail!("unsupported scheme {:?}", other),
    };
    let host = uri
        .host()
        .ok_or_else(|| anyhow!("missing host in '{uri}'"))?
        .to_string();
    let port = uri.port_u16().unwrap_or(if secure { 443 } else { 80 });
    let path = uri
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    Ok(Endpoint {
        secure,
        addr: format!("{host}:{port}"),
        host,
        path,
    })
}

/// Establishes a WebSocket session to the stream URI.
async fn connect(uri: &str) -> Result<FragmentCollector<TokioIo<Upgraded>>> {
    let endpoint = endpoint(uri)?;

    let tcp_stream = TcpStream::connect(&endpoint.addr)
        .await
        .with_context(|| format!("tcp connect to {}", endpoint.addr))?;
    tcp_stream.set_nodelay(true)?;

    let req = Request::builder()
        .method("GET")
        .uri(endpoint.path.as_str())
        .header(HOST, endpoint.addr.as_str())
        .header(UPGRADE, "websocket")
        .header(CONNECTION, "upgrade")
        .header(
            "Sec-WebSocket-Key",
            fastwebsockets::handshake::generate_key(),
        )
        .header("Sec-WebSocket-Version", "13")
        .body(Empty::<Bytes>::new())?;

    let (ws, _) = if endpoint.secure {
        let domain = ServerName::try_from(endpoint.host.as_str()).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid dns name")
        })?;
        let tls_stream = tls_connector().connect(domain, tcp_stream).await?;
        fastwebsockets::handshake::client(&SpawnExecutor, req, tls_stream).await?
    } else {
        fastwebsockets::handshake::client(&SpawnExecutor, req, tcp_stream).await?
    };

    Ok(FragmentCollector::new(ws))
}
