use crate::error::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use serde::Deserialize;

use std::convert::TryFrom;

/// Enumeration of the `engine.io` frame types.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PacketId {
    Open = 0,
    Close = 1,
    Ping = 2,
    Pong = 3,
    Message = 4,
    Upgrade = 5,
    Noop = 6,
}

impl TryFrom<u8> for PacketId {
    type Error = Error;
    fn try_from(b: u8) -> Result<Self> {
        match b as char {
            '0' => Ok(PacketId::Open),
            '1' => Ok(PacketId::Close),
            '2' => Ok(PacketId::Ping),
            '3' => Ok(PacketId::Pong),
            '4' => Ok(PacketId::Message),
            '5' => Ok(PacketId::Upgrade),
            '6' => Ok(PacketId::Noop),
            _ => Err(Error::InvalidPacketId(b as char)),
        }
    }
}

/// A single frame of the `engine.io` protocol: one ASCII digit selecting the
/// frame type, followed immediately by the raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub packet_id: PacketId,
    pub data: Bytes,
}

impl Packet {
    /// Creates a new `Packet`.
    pub fn new(packet_id: PacketId, data: Bytes) -> Self {
        Packet { packet_id, data }
    }
}

impl TryFrom<Bytes> for Packet {
    type Error = Error;
    /// Decodes a single frame from the raw bytes of a websocket text message.
    fn try_from(bytes: Bytes) -> Result<Packet> {
        if bytes.is_empty() {
            return Err(Error::EmptyPacket());
        }

        let packet_id = PacketId::try_from(bytes[0])?;
        Ok(Packet::new(packet_id, bytes.slice(1..)))
    }
}

impl From<&Packet> for Bytes {
    /// Encodes a frame into the raw bytes of a websocket text message.
    fn from(packet: &Packet) -> Bytes {
        let mut buffer = BytesMut::with_capacity(packet.data.len() + 1);
        buffer.put_u8(packet.packet_id as u8 + b'0');
        buffer.put(packet.data.as_ref());
        buffer.freeze()
    }
}

/// The parameters the server announces in the payload of the `OPEN` frame.
/// Further fields of the handshake object (`upgrades`, `maxPayload`) are of
/// no concern to a websocket-only client and are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeData {
    pub sid: String,
    pub ping_interval: u64,
    pub ping_timeout: u64,
}

impl TryFrom<&Packet> for HandshakeData {
    type Error = Error;
    fn try_from(packet: &Packet) -> Result<HandshakeData> {
        Ok(serde_json::from_slice(&packet.data)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_is_reflexive() {
        let data = Bytes::from("4Hello World");
        let packet = Packet::try_from(data.clone()).unwrap();

        assert_eq!(packet.packet_id, PacketId::Message);
        assert_eq!(packet.data, Bytes::from("Hello World"));

        assert_eq!(Bytes::from(&packet), data);
    }

    #[test]
    fn test_empty_frame() {
        let packet = Packet::new(PacketId::Pong, Bytes::new());
        assert_eq!(Bytes::from(&packet), Bytes::from("3"));

        let packet = Packet::try_from(Bytes::from("2")).unwrap();
        assert_eq!(packet, Packet::new(PacketId::Ping, Bytes::new()));
    }

    #[test]
    fn test_packet_error() {
        let err = Packet::try_from(Bytes::new());
        assert!(err.is_err());

        let err = Packet::try_from(Bytes::from("9"));
        assert!(err.is_err());
    }

    #[test]
    fn test_handshake() {
        let packet = Packet::try_from(Bytes::from(
            "0{\"sid\":\"abc\",\"upgrades\":[],\"pingInterval\":25000,\"pingTimeout\":20000}",
        ))
        .unwrap();
        assert_eq!(packet.packet_id, PacketId::Open);

        let handshake = HandshakeData::try_from(&packet).unwrap();
        assert_eq!(
            handshake,
            HandshakeData {
                sid: "abc".to_owned(),
                ping_interval: 25000,
                ping_timeout: 20000,
            }
        );
    }

    #[test]
    fn test_handshake_error() {
        let packet = Packet::new(PacketId::Open, Bytes::from("not json"));
        assert!(HandshakeData::try_from(&packet).is_err());

        let packet = Packet::new(PacketId::Open, Bytes::from("{\"sid\":\"abc\"}"));
        assert!(HandshakeData::try_from(&packet).is_err());
    }
}
