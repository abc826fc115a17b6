/// The frame types and codec of the `engine.io` protocol.
pub(crate) mod packet;
/// The websocket transport carrying the frames.
pub(crate) mod transport;
