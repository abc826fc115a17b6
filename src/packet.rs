use crate::error::{Error, Result};
use crate::event::Event;
use bytes::Bytes;
use serde_json::Value;

use std::convert::TryFrom;

/// An enumeration of the different `Packet` types in the `socket.io` protocol.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PacketId {
    Connect = 0,
    Disconnect = 1,
    Event = 2,
    Ack = 3,
    ConnectError = 4,
    BinaryEvent = 5,
    BinaryAck = 6,
}

impl TryFrom<char> for PacketId {
    type Error = Error;
    fn try_from(b: char) -> Result<Self> {
        match b {
            '0' => Ok(PacketId::Connect),
            '1' => Ok(PacketId::Disconnect),
            '2' => Ok(PacketId::Event),
            '3' => Ok(PacketId::Ack),
            '4' => Ok(PacketId::ConnectError),
            '5' => Ok(PacketId::BinaryEvent),
            '6' => Ok(PacketId::BinaryAck),
            _ => Err(Error::InvalidPacketId(b)),
        }
    }
}

/// A packet which gets sent or received during in the `socket.io` protocol.
///
/// Only `Connect`, `Disconnect` and `Event` packets are part of this client's
/// protocol surface; `decode` rejects everything else the same way it rejects
/// malformed input.
#[derive(Debug, PartialEq, Clone)]
pub struct Packet {
    pub packet_type: PacketId,
    pub data: Option<Value>,
}

impl Packet {
    /// Creates an instance.
    pub const fn new(packet_type: PacketId, data: Option<Value>) -> Self {
        Packet { packet_type, data }
    }

    /// The opening packet for the default namespace, sent without data.
    pub(crate) fn connect() -> Self {
        Packet::new(PacketId::Connect, None)
    }

    /// An event packet carrying the event name and its positional arguments.
    pub(crate) fn event(event: Event, mut args: Vec<Value>) -> Self {
        let mut data = vec![Value::String(String::from(event))];
        data.append(&mut args);
        Packet::new(PacketId::Event, Some(Value::Array(data)))
    }

    /// Encodes into the wire text carried by a `MESSAGE` frame: the packet
    /// type digit, followed by the JSON encoding of the data if present.
    pub fn encode(&self) -> Bytes {
        let mut buffer = String::new();
        buffer.push((self.packet_type as u8 + b'0') as char);

        if let Some(data) = self.data.as_ref() {
            buffer.push_str(&data.to_string());
        }

        Bytes::from(buffer)
    }

    /// Decodes a packet from the payload of a `MESSAGE` frame (the frame
    /// type digit already stripped by the caller).
    pub fn decode(payload: &str) -> Result<Packet> {
        let id_char = payload.chars().next().ok_or(Error::EmptyPacket())?;
        let packet_type = PacketId::try_from(id_char)?;

        let rest = &payload[id_char.len_utf8()..];
        let data = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str::<Value>(rest)?)
        };

        let packet = Packet { packet_type, data };
        packet.validate()?;

        Ok(packet)
    }

    fn validate(&self) -> Result<()> {
        let valid = match self.packet_type {
            PacketId::Connect => matches!(self.data, Some(Value::Object(_))),
            PacketId::Disconnect => self.data.is_none(),
            PacketId::Event => match self.data.as_ref() {
                Some(Value::Array(args)) => args.first().map_or(false, Value::is_string),
                _ => false,
            },
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(Error::InvalidPacket())
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_encode() {
        let packet = Packet::new(PacketId::Connect, Some(json!({"sid": "abc"})));
        assert_eq!(packet.encode(), "0{\"sid\":\"abc\"}");

        let packet = Packet::connect();
        assert_eq!(packet.encode(), "0");

        let packet = Packet::new(PacketId::Disconnect, None);
        assert_eq!(packet.encode(), "1");

        let packet = Packet::event("hello".into(), vec![json!(1)]);
        assert_eq!(packet.encode(), "2[\"hello\",1]");

        let packet = Packet::event("chat message".into(), vec![json!({"text": "hi"})]);
        assert_eq!(packet.encode(), "2[\"chat message\",{\"text\":\"hi\"}]");
    }

    #[test]
    fn test_decode() {
        let packet = Packet::decode("0{\"sid\":\"abc\"}").unwrap();
        assert_eq!(
            packet,
            Packet::new(PacketId::Connect, Some(json!({"sid": "abc"})))
        );

        let packet = Packet::decode("1").unwrap();
        assert_eq!(packet, Packet::new(PacketId::Disconnect, None));

        let packet = Packet::decode("2[\"hello\",1]").unwrap();
        assert_eq!(
            packet,
            Packet::new(PacketId::Event, Some(json!(["hello", 1])))
        );
    }

    #[test]
    fn test_decode_rejects() {
        // connect requires object data
        assert!(Packet::decode("0").is_err());
        assert!(Packet::decode("0[]").is_err());

        // disconnect must not carry data
        assert!(Packet::decode("1x").is_err());
        assert!(Packet::decode("1{}").is_err());

        // event requires a non-empty array with a leading string
        assert!(Packet::decode("2").is_err());
        assert!(Packet::decode("2[]").is_err());
        assert!(Packet::decode("2[1,2]").is_err());
        assert!(Packet::decode("2{\"not\":\"array\"}").is_err());

        // unsupported packet types
        assert!(Packet::decode("3[]").is_err());
        assert!(Packet::decode("4{}").is_err());
        assert!(Packet::decode("5{}").is_err());
        assert!(Packet::decode("61-[]").is_err());

        // not a packet at all
        assert!(Packet::decode("").is_err());
        assert!(Packet::decode("9").is_err());
        assert!(Packet::decode("2[\"hello\",").is_err());
    }

    #[test]
    fn test_roundtrip() {
        let packets = vec![
            Packet::new(PacketId::Connect, Some(json!({}))),
            Packet::new(PacketId::Connect, Some(json!({"sid": "abc"}))),
            Packet::new(PacketId::Disconnect, None),
            Packet::new(PacketId::Event, Some(json!(["hello"]))),
            Packet::new(
                PacketId::Event,
                Some(json!(["chat message", {"text": "hi"}, 42])),
            ),
        ];

        for packet in packets {
            let encoded = packet.encode();
            let decoded = Packet::decode(std::str::from_utf8(&encoded).unwrap()).unwrap();
            assert_eq!(decoded, packet);
        }
    }
}
