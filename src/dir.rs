use std::fmt;

/// Media direction of an m-line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Send only direction.
    SendOnly,
    /// Receive only direction.
    RecvOnly,
    /// Bi-directional.
    SendRecv,
    /// Disabled direction.
    Inactive,
}

impl Direction {
    /// Whether this direction is a sending direction.
    ///
    /// Only sending m-lines carry a local source to put simulcast on.
    pub fn is_sending(&self) -> bool {
        matches!(self, Direction::SendOnly | Direction::SendRecv)
    }

    pub(crate) fn parse(v: &str) -> Option<Self> {
        use Direction::*;
        match v {
            "sendonly" => Some(SendOnly),
            "recvonly" => Some(RecvOnly),
            "sendrecv" => Some(SendRecv),
            "inactive" => Some(Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Direction::SendOnly => "sendonly",
                Direction::RecvOnly => "recvonly",
                Direction::SendRecv => "sendrecv",
                Direction::Inactive => "inactive",
            }
        )
    }
}
