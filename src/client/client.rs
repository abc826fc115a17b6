use super::callback::Callback;
use super::emitter::EventEmitter;
use crate::engineio::packet::{HandshakeData, Packet as EnginePacket, PacketId as EnginePacketId};
use crate::engineio::transport::engine_url;
use crate::error::Result;
use crate::event::Event;
use crate::packet::{Packet, PacketId};
use crate::payload::Payload;
use crate::socket::Socket as InnerSocket;
use bytes::Bytes;
use log::{debug, trace, warn};
use serde_json::Value;
use url::Url;

use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// The reason strings surfaced with the local `disconnect` and
/// `connect_error` events, matching the socket.io client vocabulary.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum DisconnectReason {
    TransportClose,
    PingTimeout,
    ParseError,
    ServerDisconnect,
    ClientDisconnect,
}

impl DisconnectReason {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            DisconnectReason::TransportClose => "transport close",
            DisconnectReason::PingTimeout => "ping timeout",
            DisconnectReason::ParseError => "parse error",
            DisconnectReason::ServerDisconnect => "io server disconnect",
            DisconnectReason::ClientDisconnect => "io client disconnect",
        }
    }
}

/// A client for the default namespace of a socket.io server, driven over a
/// single websocket. Cheap to clone; all clones share one connection.
///
/// The connection engine runs on a background thread: it performs the
/// handshake, answers heartbeat pings, forwards inbound events to the
/// registered callbacks and re-opens the connection a fixed delay after
/// every close until [`Client::disconnect`] is called or the server sends a
/// disconnect packet of its own.
#[derive(Clone)]
pub struct Client {
    socket: InnerSocket,
    emitter: EventEmitter,
    url: Arc<Url>,
    reconnection_delay: Duration,
}

impl Client {
    pub(crate) fn new(
        origin: Url,
        path: &str,
        reconnection_delay: Duration,
        on: HashMap<Event, Vec<Callback>>,
    ) -> Result<Self> {
        let emitter = EventEmitter::default();
        for (event, callbacks) in on {
            for callback in callbacks {
                emitter.on(event.clone(), callback)?;
            }
        }

        Ok(Client {
            socket: InnerSocket::new(),
            emitter,
            url: Arc::new(engine_url(&origin, path)?),
            reconnection_delay,
        })
    }

    /// Registers an additional callback for a certain event. Unlike
    /// registration through the builder this can be done at any time, also
    /// while the connection is up.
    pub fn on<T: Into<Event>, F>(&self, event: T, callback: F) -> Result<()>
    where
        F: for<'a> FnMut(Payload, &'a Client) + 'static + Sync + Send,
    {
        self.emitter.on(event.into(), Callback::new(callback))
    }

    /// Emits an event with the given payload to the server. Transmitted
    /// immediately while the connection is acknowledged; buffered in
    /// submission order and flushed on the next acknowledgment otherwise.
    ///
    /// # Example
    /// ```no_run
    /// use socketio_lite::ClientBuilder;
    /// use serde_json::json;
    ///
    /// let client = ClientBuilder::new("http://localhost:3000")
    ///     .connect()
    ///     .expect("Connection failed");
    ///
    /// client.emit("chat message", json!({"text": "hi"})).expect("emit failed");
    /// ```
    pub fn emit<E, D>(&self, event: E, data: D) -> Result<()>
    where
        E: Into<Event>,
        D: Into<Payload>,
    {
        let packet = Packet::event(event.into(), data.into().into_args());
        self.socket.send_or_buffer(packet)
    }

    /// Disconnects from the server and disables any further reconnection
    /// attempts. Safe to call in any state, including before the first
    /// connection ever came up.
    pub fn disconnect(&self) -> Result<()> {
        self.socket.disable_reconnect();
        self.close(self.socket.attempt(), DisconnectReason::ClientDisconnect)?;
        self.socket.interrupt_reconnect();
        Ok(())
    }

    /// The session id assigned by the server, present while connected.
    pub fn id(&self) -> Option<String> {
        self.socket.session_id()
    }

    /// Whether the server has acknowledged the connection.
    pub fn connected(&self) -> bool {
        self.socket.is_connected()
    }

    /// Spawns the background engine driving the connection.
    pub(crate) fn spawn_poll_loop(&self) {
        let client = self.clone();
        thread::spawn(move || {
            if let Err(err) = client.poll_loop() {
                warn!("connection engine stopped: {err}");
            }
        });
    }

    /// One iteration per connection attempt: open the transport, pump frames
    /// until the attempt closes, then park for the fixed reconnection delay.
    /// Ends for good once reconnection is disabled.
    fn poll_loop(&self) -> Result<()> {
        loop {
            let attempt = self.socket.attempt();
            trace!("opening {}", self.url);
            match self.socket.open_transport(attempt, &self.url) {
                Ok(()) => self.pump(attempt)?,
                Err(err) => {
                    debug!("transport open failed: {err}");
                    self.close(attempt, DisconnectReason::TransportClose)?;
                }
            }

            if !self.socket.wait_reconnect(self.reconnection_delay)? {
                return Ok(());
            }
        }
    }

    /// Reads frames for one connection attempt until it closes, watching the
    /// heartbeat deadline between reads.
    fn pump(&self, attempt: u64) -> Result<()> {
        loop {
            if self.socket.attempt() != attempt {
                // closed from the outside
                return Ok(());
            }

            if self.socket.ping_deadline_elapsed()? {
                return self.close(attempt, DisconnectReason::PingTimeout);
            }

            match self.socket.poll_data() {
                Ok(Some(data)) => self.handle_data(attempt, data)?,
                Ok(None) => (),
                Err(err) => {
                    debug!("transport error: {err}");
                    return self.close(attempt, DisconnectReason::TransportClose);
                }
            }
        }
    }

    /// Dispatches a single inbound websocket message. Only `OPEN`, `CLOSE`,
    /// `PING` and `MESSAGE` frames have client-side transitions; everything
    /// else is indistinguishable from malformed input.
    fn handle_data(&self, attempt: u64, data: Bytes) -> Result<()> {
        let frame = match EnginePacket::try_from(data) {
            Ok(frame) => frame,
            Err(_) => return self.close(attempt, DisconnectReason::ParseError),
        };

        match frame.packet_id {
            EnginePacketId::Open => self.handle_open(attempt, &frame),
            EnginePacketId::Close => self.close(attempt, DisconnectReason::TransportClose),
            EnginePacketId::Ping => {
                self.socket.pinged()?;
                self.socket
                    .send_frame(EnginePacket::new(EnginePacketId::Pong, Bytes::new()))
            }
            EnginePacketId::Message => self.handle_message(attempt, &frame),
            _ => self.close(attempt, DisconnectReason::ParseError),
        }
    }

    /// Consumes the handshake: arms the heartbeat deadline and requests the
    /// default namespace.
    fn handle_open(&self, attempt: u64, frame: &EnginePacket) -> Result<()> {
        let handshake = match HandshakeData::try_from(frame) {
            Ok(handshake) => handshake,
            Err(_) => return self.close(attempt, DisconnectReason::ParseError),
        };

        trace!(
            "handshake: sid={} deadline={}ms",
            handshake.sid,
            handshake.ping_interval + handshake.ping_timeout
        );
        self.socket.handshake(&handshake)?;
        self.socket.send_packet(&Packet::connect())
    }

    fn handle_message(&self, attempt: u64, frame: &EnginePacket) -> Result<()> {
        let packet = match std::str::from_utf8(&frame.data)
            .map_err(crate::error::Error::from)
            .and_then(Packet::decode)
        {
            Ok(packet) => packet,
            Err(err) => {
                debug!("undecodable packet: {err}");
                return self.close(attempt, DisconnectReason::ParseError);
            }
        };

        match packet.packet_type {
            PacketId::Connect => self.handle_connect(packet),
            PacketId::Disconnect => {
                self.socket.disable_reconnect();
                self.close(attempt, DisconnectReason::ServerDisconnect)
            }
            PacketId::Event => self.handle_event(packet),
            // decode only lets the three supported types through
            _ => self.close(attempt, DisconnectReason::ParseError),
        }
    }

    /// The server acknowledged the namespace connect: record the session,
    /// flush the send buffer and let subscribers know.
    fn handle_connect(&self, packet: Packet) -> Result<()> {
        let session_id = packet
            .data
            .as_ref()
            .and_then(|data| data.get("sid"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        self.socket.acknowledge(session_id)?;
        self.emitter.emit(&Event::Connect, Payload::Text(vec![]), self)
    }

    /// Forwards an inbound event packet to the local subscribers: first
    /// element is the event name, the rest are its positional arguments.
    fn handle_event(&self, packet: Packet) -> Result<()> {
        // decode guarantees a non-empty array with a leading string
        let Some(Value::Array(mut args)) = packet.data else {
            return Ok(());
        };
        let Value::String(name) = args.remove(0) else {
            return Ok(());
        };

        self.emitter.emit(&Event::from(name), Payload::Text(args), self)
    }

    /// The single close routine every failure mode funnels through. It is
    /// idempotent per connection attempt: tears the transport down, cancels
    /// the heartbeat deadline and surfaces the reason to subscribers, as
    /// `disconnect` when the connection had been acknowledged and as
    /// `connect_error` otherwise. The engine schedules the one reconnection
    /// attempt afterwards, provided the gate is still open.
    fn close(&self, attempt: u64, reason: DisconnectReason) -> Result<()> {
        if !self.socket.begin_close(attempt) {
            // that attempt is already being torn down
            return Ok(());
        }

        debug!("connection closed: {}", reason.as_str());
        let was_connected = self.socket.teardown()?;
        let event = if was_connected {
            Event::Disconnect
        } else {
            Event::ConnectError
        };
        self.emitter.emit(&event, Payload::from(reason.as_str()), self)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "Client(url: {:?}, connected: {:?})",
            self.url,
            self.connected(),
        ))
    }
}
