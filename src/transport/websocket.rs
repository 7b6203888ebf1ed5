//! WebSocket duplex channel

use async_trait::async_trait;
use futures::{future, SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};
use url::Url;

use super::channel::{Connector, DuplexChannel};
use crate::error::{Result, TransportError};

/// Path of the duplex endpoint on the visualization server
const ENDPOINT_PATH: &str = "/ws";

/// Derive the duplex endpoint from a page origin.
///
/// `http` becomes `ws` and `https` becomes `wss`; the path is replaced with
/// `/ws`. Origins that are already `ws`/`wss` keep their path if they have one.
pub fn endpoint_from_origin(origin: &str) -> Result<Url> {
    let mut url = Url::parse(origin)
        .map_err(|e| TransportError::InvalidEndpoint(format!("{}: {}", origin, e)))?;

    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        "ws" | "wss" => {
            if url.path().is_empty() || url.path() == "/" {
                url.set_path(ENDPOINT_PATH);
            }
            return Ok(url);
        }
        other => {
            return Err(TransportError::InvalidEndpoint(format!(
                "unsupported scheme '{}' in {}",
                other, origin
            )))
        }
    };

    url.set_scheme(scheme)
        .map_err(|()| TransportError::InvalidEndpoint(origin.to_string()))?;
    url.set_path(ENDPOINT_PATH);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Opens WebSocket channels with tokio-tungstenite.
///
/// The token, when present, is offered as the `Sec-WebSocket-Protocol` value.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(&self, endpoint: &str, token: Option<&str>) -> Result<DuplexChannel> {
        let mut request = endpoint.into_client_request()?;
        if let Some(token) = token {
            let value = HeaderValue::from_str(token)
                .map_err(|e| TransportError::Connection(format!("invalid token: {}", e)))?;
            request.headers_mut().insert("Sec-WebSocket-Protocol", value);
        }

        debug!("Connecting to {}", endpoint);
        let (ws_stream, _resp) = connect_async(request).await?;
        info!(endpoint, "WebSocket open");

        let (write, read) = ws_stream.split();

        let sink = write
            .sink_map_err(TransportError::from)
            .with(|frame: String| future::ready(Ok::<_, TransportError>(Message::text(frame))));

        let stream = read.filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(data)) => Some(
                    String::from_utf8(data.to_vec())
                        .map_err(|e| TransportError::Connection(format!("non-UTF-8 frame: {}", e))),
                ),
                // tungstenite answers pings itself; the stream ends after a close frame
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_)) => {
                    None
                }
                Err(e) => Some(Err(TransportError::from(e))),
            })
        });

        Ok(DuplexChannel::new(Box::pin(sink), Box::pin(stream)))
    }
}
