//! Marker contract for messages exchanged with the game server.

use std::{fmt, str::FromStr};

use crate::{NegativeHonourReason, UnknownHonourCode};

/// Side of the connection a message originates from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageOrigin {
    /// Sent by this client to the server.
    Client,
    /// Sent by the server to this client.
    Server,
}

/// A message that can travel between client and server.
///
/// Every message must render to text so it can be logged or written to the
/// wire; framing and parsing of concrete messages belong to the network layer.
pub trait Message: fmt::Display + fmt::Debug {
    /// Side of the connection that produced the message.
    fn origin(&self) -> MessageOrigin;
}

/// Server notice that this client broke a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NegativeHonourMessage {
    reason: NegativeHonourReason,
}

impl NegativeHonourMessage {
    /// Wraps the provided reason.
    #[must_use]
    pub const fn new(reason: NegativeHonourReason) -> Self {
        Self { reason }
    }

    /// Reason attached to the notice.
    #[must_use]
    pub const fn reason(&self) -> NegativeHonourReason {
        self.reason
    }
}

impl fmt::Display for NegativeHonourMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#", self.reason.code())
    }
}

impl FromStr for NegativeHonourMessage {
    type Err = UnknownHonourCode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.parse().map(Self::new)
    }
}

impl Message for NegativeHonourMessage {
    fn origin(&self) -> MessageOrigin {
        MessageOrigin::Server
    }
}
