use crate::engineio::packet::{HandshakeData, Packet as EnginePacket, PacketId as EnginePacketId};
use crate::engineio::transport::{Transport, WebsocketTransport};
use crate::error::{Error, Result};
use crate::packet::Packet;
use bytes::Bytes;
use log::debug;
use url::Url;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::time::{Duration, Instant};

/// Owns the mutable state of one client connection: the live transport, the
/// session bookkeeping, the heartbeat deadline and the outbound buffer. All
/// mutation goes through the methods on this type; the facade and the engine
/// thread share it via cheap clones.
#[derive(Clone)]
pub(crate) struct Socket {
    transport: Arc<RwLock<Option<Arc<dyn Transport>>>>,
    connected: Arc<AtomicBool>,
    session_id: Arc<RwLock<Option<String>>>,
    send_buffer: Arc<Mutex<VecDeque<Packet>>>,
    reconnect: Arc<AtomicBool>,
    /// Counts connection attempts. Bumped exactly once per close; any caller
    /// still holding an older value is acting on a connection that no longer
    /// exists and must stand down.
    attempt: Arc<AtomicU64>,
    last_ping: Arc<Mutex<Instant>>,
    /// `ping_interval + ping_timeout` from the handshake; `None` until the
    /// handshake arrived and again after teardown.
    max_ping_timeout: Arc<Mutex<Option<Duration>>>,
    /// Parking spot for the engine thread between two connection attempts.
    reconnect_signal: Arc<(Mutex<()>, Condvar)>,
}

impl Socket {
    pub(crate) fn new() -> Self {
        Socket {
            transport: Arc::new(RwLock::new(None)),
            connected: Arc::new(AtomicBool::default()),
            session_id: Arc::new(RwLock::new(None)),
            send_buffer: Arc::new(Mutex::new(VecDeque::new())),
            reconnect: Arc::new(AtomicBool::new(true)),
            attempt: Arc::new(AtomicU64::new(0)),
            last_ping: Arc::new(Mutex::new(Instant::now())),
            max_ping_timeout: Arc::new(Mutex::new(None)),
            reconnect_signal: Arc::new((Mutex::new(()), Condvar::new())),
        }
    }

    pub(crate) fn attempt(&self) -> u64 {
        self.attempt.load(Ordering::Acquire)
    }

    /// Claims the teardown of connection attempt `attempt`. Exactly one
    /// caller per attempt wins; everybody else is acting on a connection
    /// that is already being torn down.
    pub(crate) fn begin_close(&self, attempt: u64) -> bool {
        self.attempt
            .compare_exchange(attempt, attempt + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Opens a fresh websocket transport and installs it as the current one.
    /// A transport that finishes opening after attempt `attempt` was already
    /// closed is shut down on the spot instead of installed.
    pub(crate) fn open_transport(&self, attempt: u64, url: &Url) -> Result<()> {
        let transport = Arc::new(WebsocketTransport::new(url.clone())?);

        let mut slot = self.transport.write()?;
        if self.attempt() != attempt {
            drop(slot);
            let _ = transport.shutdown();
            return Err(Error::StoppedTransport());
        }
        *slot = Some(transport);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn set_transport(&self, transport: Arc<dyn Transport>) {
        *self.transport.write().unwrap() = Some(transport);
    }

    /// Waits for the next inbound websocket message on the current
    /// transport. `Ok(None)` means nothing arrived within the poll interval.
    pub(crate) fn poll_data(&self) -> Result<Option<Bytes>> {
        let transport = self
            .transport
            .read()?
            .clone()
            .ok_or_else(Error::StoppedTransport)?;
        transport.poll()
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub(crate) fn session_id(&self) -> Option<String> {
        self.session_id.read().ok().and_then(|id| id.clone())
    }

    /// Consumes the handshake parameters: derives the heartbeat deadline and
    /// starts the first deadline window.
    pub(crate) fn handshake(&self, handshake: &HandshakeData) -> Result<()> {
        *self.max_ping_timeout.lock()? =
            Some(Duration::from_millis(handshake.ping_interval + handshake.ping_timeout));
        self.pinged()
    }

    /// Restarts the heartbeat deadline window. There is only ever one such
    /// window; resetting the instant is the cancel-and-rearm.
    pub(crate) fn pinged(&self) -> Result<()> {
        *self.last_ping.lock()? = Instant::now();
        Ok(())
    }

    /// Whether the negotiated heartbeat deadline has passed without a ping.
    /// Never trips before the handshake announced the deadline.
    pub(crate) fn ping_deadline_elapsed(&self) -> Result<bool> {
        let Some(max_ping_timeout) = *self.max_ping_timeout.lock()? else {
            return Ok(false);
        };
        Ok(self.last_ping.lock()?.elapsed() > max_ping_timeout)
    }

    #[cfg(test)]
    pub(crate) fn rewind_last_ping(&self, by: Duration) {
        let mut last_ping = self.last_ping.lock().unwrap();
        *last_ping -= by;
    }

    /// Transmits a `socket.io` packet right away when the connection is
    /// acknowledged, otherwise queues it for the flush that the next
    /// acknowledgment performs.
    pub(crate) fn send_or_buffer(&self, packet: Packet) -> Result<()> {
        let mut buffer = self.send_buffer.lock()?;
        if self.is_connected() {
            drop(buffer);
            self.send_packet(&packet)
        } else {
            buffer.push_back(packet);
            Ok(())
        }
    }

    /// Marks the connection acknowledged, records the session id and flushes
    /// everything buffered while the connection was down, preserving
    /// submission order.
    pub(crate) fn acknowledge(&self, session_id: Option<String>) -> Result<()> {
        *self.session_id.write()? = session_id;

        // the buffer lock spans the flag flip and the flush, so a
        // concurrent `send_or_buffer` either lands in the drained backlog
        // or transmits strictly after it
        let mut buffer = self.send_buffer.lock()?;
        self.connected.store(true, Ordering::Release);
        for packet in buffer.drain(..).collect::<Vec<_>>() {
            self.send_packet(&packet)?;
        }

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn buffered(&self) -> usize {
        self.send_buffer.lock().unwrap().len()
    }

    /// Encodes a `socket.io` packet into a `MESSAGE` frame and writes it out.
    pub(crate) fn send_packet(&self, packet: &Packet) -> Result<()> {
        self.send_frame(EnginePacket::new(EnginePacketId::Message, packet.encode()))
    }

    /// Writes a single `engine.io` frame. Dropped silently when no transport
    /// is attached or the write fails; a dead transport surfaces through the
    /// poll loop, not through here.
    pub(crate) fn send_frame(&self, frame: EnginePacket) -> Result<()> {
        let Some(transport) = self.transport.read()?.clone() else {
            return Ok(());
        };

        if let Err(err) = transport.emit(Bytes::from(&frame)) {
            debug!("frame dropped after transport error: {err}");
        }
        Ok(())
    }

    /// Detaches and shuts down the current transport, cancels the heartbeat
    /// deadline and reports whether the connection had been acknowledged.
    /// Further signals from the detached transport have nowhere to land.
    pub(crate) fn teardown(&self) -> Result<bool> {
        if let Some(transport) = self.transport.write()?.take() {
            if let Err(err) = transport.shutdown() {
                debug!("transport shutdown failed: {err}");
            }
        }

        *self.max_ping_timeout.lock()? = None;

        let was_connected = self.connected.swap(false, Ordering::AcqRel);
        if was_connected {
            *self.session_id.write()? = None;
        }
        Ok(was_connected)
    }

    pub(crate) fn reconnect_enabled(&self) -> bool {
        self.reconnect.load(Ordering::Acquire)
    }

    pub(crate) fn disable_reconnect(&self) {
        self.reconnect.store(false, Ordering::Release);
    }

    /// Parks the engine thread for the fixed reconnection delay. Returns
    /// `false` when reconnection was disabled before or during the wait,
    /// `true` once the delay expired and another attempt should start.
    pub(crate) fn wait_reconnect(&self, delay: Duration) -> Result<bool> {
        let (lock, condvar) = &*self.reconnect_signal;
        let start = Instant::now();
        let mut guard = lock.lock()?;

        loop {
            if !self.reconnect_enabled() {
                return Ok(false);
            }

            let elapsed = start.elapsed();
            if elapsed >= delay {
                return Ok(true);
            }

            let (next, _) = condvar.wait_timeout(guard, delay - elapsed)?;
            guard = next;
        }
    }

    /// Wakes an engine thread parked in `wait_reconnect` so it can observe a
    /// freshly disabled reconnection gate.
    pub(crate) fn interrupt_reconnect(&self) {
        let (_, condvar) = &*self.reconnect_signal;
        condvar.notify_all();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engineio::transport::test::MockTransport;
    use crate::packet::PacketId;
    use serde_json::json;

    fn socket_with_mock() -> (Socket, Arc<MockTransport>) {
        let socket = Socket::new();
        let transport = Arc::new(MockTransport::default());
        socket.set_transport(transport.clone());
        (socket, transport)
    }

    #[test]
    fn buffers_until_acknowledged() {
        let (socket, transport) = socket_with_mock();

        socket
            .send_or_buffer(Packet::event("first".into(), vec![]))
            .unwrap();
        socket
            .send_or_buffer(Packet::event("second".into(), vec![json!(2)]))
            .unwrap();
        socket
            .send_or_buffer(Packet::event("third".into(), vec![]))
            .unwrap();

        assert_eq!(socket.buffered(), 3);
        assert!(transport.sent().is_empty());

        socket.acknowledge(Some("abc".to_owned())).unwrap();

        assert_eq!(
            transport.sent(),
            vec!["42[\"first\"]", "42[\"second\",2]", "42[\"third\"]"]
        );
        assert_eq!(socket.buffered(), 0);
        assert_eq!(socket.session_id(), Some("abc".to_owned()));
        assert!(socket.is_connected());

        // acknowledged connections transmit right away
        socket
            .send_or_buffer(Packet::event("fourth".into(), vec![]))
            .unwrap();
        assert_eq!(socket.buffered(), 0);
        assert_eq!(transport.sent().len(), 4);
    }

    #[test]
    fn heartbeat_deadline() {
        let (socket, _transport) = socket_with_mock();

        // no deadline before the handshake
        assert!(!socket.ping_deadline_elapsed().unwrap());

        let handshake = HandshakeData {
            sid: "abc".to_owned(),
            ping_interval: 20,
            ping_timeout: 5,
        };
        socket.handshake(&handshake).unwrap();
        assert!(!socket.ping_deadline_elapsed().unwrap());

        socket.rewind_last_ping(Duration::from_millis(26));
        assert!(socket.ping_deadline_elapsed().unwrap());

        // a ping rearms the window
        socket.pinged().unwrap();
        assert!(!socket.ping_deadline_elapsed().unwrap());
    }

    #[test]
    fn teardown_clears_session() {
        let (socket, _transport) = socket_with_mock();
        socket.acknowledge(Some("abc".to_owned())).unwrap();

        let was_connected = socket.teardown().unwrap();
        assert!(was_connected);
        assert!(!socket.is_connected());
        assert_eq!(socket.session_id(), None);
        assert!(!socket.ping_deadline_elapsed().unwrap());

        // second teardown is a plain no-op
        assert!(!socket.teardown().unwrap());
    }

    #[test]
    fn begin_close_claims_attempt_once() {
        let socket = Socket::new();
        let attempt = socket.attempt();

        assert!(socket.begin_close(attempt));
        assert!(!socket.begin_close(attempt));
        assert_eq!(socket.attempt(), attempt + 1);
    }

    #[test]
    fn wait_reconnect_honors_gate() {
        let socket = Socket::new();
        assert!(socket.wait_reconnect(Duration::from_millis(1)).unwrap());

        socket.disable_reconnect();
        assert!(!socket.wait_reconnect(Duration::from_millis(1)).unwrap());
    }

    #[test]
    fn frames_without_transport_are_dropped() {
        let socket = Socket::new();
        socket
            .send_packet(&Packet::new(PacketId::Connect, None))
            .unwrap();
        assert!(socket.poll_data().is_err());
    }
}
