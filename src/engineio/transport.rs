use crate::error::{Error, Result};
use crate::ENGINE_IO_VERSION;
use bytes::Bytes;
use log::debug;
use tungstenite::connect;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::Message;
use tungstenite::WebSocket;
use url::Url;

use std::io::ErrorKind;
use std::net::{Shutdown, TcpStream};
use std::str::from_utf8;
use std::sync::Mutex;
use std::time::Duration;

/// Granularity of a single blocking read on the websocket. Bounds both how
/// long the transport lock is held and how often the poll loop regains
/// control for deadline and shutdown checks.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The transport seam of a connection: a full-duplex pipe that carries raw
/// `engine.io` frames. One instance backs exactly one connection attempt and
/// is discarded on close.
pub(crate) trait Transport: Send + Sync {
    /// Writes a single frame to the wire.
    fn emit(&self, data: Bytes) -> Result<()>;

    /// Waits up to the poll interval for the next inbound frame. `Ok(None)`
    /// means nothing arrived within the interval; an error means the
    /// connection is gone.
    fn poll(&self) -> Result<Option<Bytes>>;

    /// Tears the underlying connection down. Must be callable while another
    /// thread is blocked inside `poll`.
    fn shutdown(&self) -> Result<()>;
}

/// Derives the websocket endpoint from a caller-supplied origin: an `http`
/// scheme maps to its websocket counterpart, the configured request path is
/// appended and the engine.io query parameters are fixed.
pub(crate) fn engine_url(origin: &Url, path: &str) -> Result<Url> {
    let mut url = origin.clone();
    match url.scheme() {
        // SAFETY: "ws" and "wss" are valid schemes, set_scheme can't fail
        "http" | "ws" => url.set_scheme("ws").unwrap(),
        "https" | "wss" => url.set_scheme("wss").unwrap(),
        scheme => return Err(Error::InvalidUrlScheme(scheme.to_owned())),
    }

    url.set_path(path);
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair("EIO", &ENGINE_IO_VERSION.to_string())
        .append_pair("transport", "websocket");

    Ok(url)
}

pub(crate) struct WebsocketTransport {
    client: Mutex<WebSocket<MaybeTlsStream<TcpStream>>>,
    /// Cloned handle onto the raw stream, used to unblock a `poll` in
    /// progress when shutting down from another thread.
    stream: TcpStream,
    base_url: Url,
}

impl WebsocketTransport {
    /// Opens a websocket connection to the given endpoint.
    pub(crate) fn new(url: Url) -> Result<Self> {
        let (client, _) = connect(url.as_str())?;

        let stream = match client.get_ref() {
            MaybeTlsStream::Plain(stream) => stream.try_clone()?,
            MaybeTlsStream::NativeTls(stream) => stream.get_ref().try_clone()?,
            _ => return Err(Error::InvalidUrlScheme(url.scheme().to_owned())),
        };
        stream.set_read_timeout(Some(POLL_INTERVAL))?;

        Ok(WebsocketTransport {
            client: Mutex::new(client),
            stream,
            base_url: url,
        })
    }
}

impl Transport for WebsocketTransport {
    fn emit(&self, data: Bytes) -> Result<()> {
        let mut client = self.client.lock()?;
        client.send(Message::text(from_utf8(&data)?))?;
        Ok(())
    }

    fn poll(&self) -> Result<Option<Bytes>> {
        let mut client = self.client.lock()?;
        match client.read() {
            Ok(Message::Text(text)) => Ok(Some(Bytes::from(text))),
            // binary payloads are not part of this client's protocol surface
            Ok(Message::Binary(_)) => Ok(None),
            Ok(Message::Close(_)) => Err(Error::StoppedTransport()),
            // websocket-level ping/pong and raw frames are handled a layer below
            Ok(_) => Ok(None),
            Err(tungstenite::Error::Io(ref err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn shutdown(&self) -> Result<()> {
        // try a clean close frame first, but never wait on the lock: the
        // poll loop may well be holding it
        if let Ok(mut client) = self.client.try_lock() {
            if let Err(err) = client.close(None) {
                debug!("close frame not sent: {err}");
            }
        }

        match self.stream.shutdown(Shutdown::Both) {
            Err(err) if err.kind() != ErrorKind::NotConnected => Err(err.into()),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for WebsocketTransport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!(
            "WebsocketTransport(base_url: {:?})",
            self.base_url,
        ))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::collections::VecDeque;

    /// An in-memory stand-in for the websocket: frames pushed into `incoming`
    /// come out of `poll`, everything emitted lands in `outgoing`.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        pub(crate) incoming: Mutex<VecDeque<Bytes>>,
        pub(crate) outgoing: Mutex<Vec<Bytes>>,
    }

    impl Transport for MockTransport {
        fn emit(&self, data: Bytes) -> Result<()> {
            self.outgoing.lock()?.push(data);
            Ok(())
        }

        fn poll(&self) -> Result<Option<Bytes>> {
            Ok(self.incoming.lock()?.pop_front())
        }

        fn shutdown(&self) -> Result<()> {
            Ok(())
        }
    }

    impl MockTransport {
        pub(crate) fn sent(&self) -> Vec<String> {
            self.outgoing
                .lock()
                .unwrap()
                .iter()
                .map(|data| String::from_utf8(data.to_vec()).unwrap())
                .collect()
        }
    }

    #[test]
    fn test_engine_url() {
        let url = Url::parse("http://localhost:3000").unwrap();
        assert_eq!(
            engine_url(&url, "/socket.io/").unwrap().to_string(),
            "ws://localhost:3000/socket.io/?EIO=4&transport=websocket"
        );

        let url = Url::parse("https://example.com").unwrap();
        assert_eq!(
            engine_url(&url, "/chat/").unwrap().to_string(),
            "wss://example.com/chat/?EIO=4&transport=websocket"
        );

        let url = Url::parse("ftp://example.com").unwrap();
        assert!(engine_url(&url, "/socket.io/").is_err());
    }
}
