/// An `Event` in `socket.io` could either be one of the lifecycle events
/// (`Connect`, `Disconnect`, `ConnectError`) or a custom event defined by a
/// string, e.g. `chat message` or `foo`.
#[derive(Debug, PartialEq, PartialOrd, Clone, Eq, Hash)]
pub enum Event {
    Connect,
    Disconnect,
    ConnectError,
    Custom(String),
}

impl From<String> for Event {
    fn from(string: String) -> Self {
        match &string[..] {
            "connect" => Event::Connect,
            "disconnect" => Event::Disconnect,
            "connect_error" => Event::ConnectError,
            _ => Event::Custom(string),
        }
    }
}

impl From<&str> for Event {
    fn from(string: &str) -> Self {
        Event::from(String::from(string))
    }
}

impl From<Event> for String {
    fn from(event: Event) -> Self {
        match event {
            Event::Connect => Self::from("connect"),
            Event::Disconnect => Self::from("disconnect"),
            Event::ConnectError => Self::from("connect_error"),
            Event::Custom(string) => string,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from() {
        let sut = Event::from("connect");
        assert_eq!(sut, Event::Connect);

        let sut = Event::from("disconnect");
        assert_eq!(sut, Event::Disconnect);

        let sut = Event::from("connect_error");
        assert_eq!(sut, Event::ConnectError);

        let sut = Event::from(String::from("chat message"));
        assert_eq!(sut, Event::Custom(String::from("chat message")));

        assert_eq!(String::from(Event::Connect), "connect");
        assert_eq!(String::from(Event::Custom("foo".to_owned())), "foo");
    }
}
