use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// The `type` of a session description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    /// An offer.
    Offer,
    /// A final answer.
    Answer,
    /// A provisional answer.
    Pranswer,
    /// Cancel the current offer.
    Rollback,
}

impl FromStr for SdpType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offer" => Ok(SdpType::Offer),
            "answer" => Ok(SdpType::Answer),
            "pranswer" => Ok(SdpType::Pranswer),
            "rollback" => Ok(SdpType::Rollback),
            _ => Err(format!("unknown sdp type: {s}")),
        }
    }
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SdpType::Offer => "offer",
            SdpType::Answer => "answer",
            SdpType::Pranswer => "pranswer",
            SdpType::Rollback => "rollback",
        };
        write!(f, "{s}")
    }
}

/// A session description as passed to and from `RTCPeerConnection`.
///
/// Serializes as `{"type": "offer", "sdp": "v=0\r\n..."}`. A missing or empty
/// `type` deserializes to `None`, a missing `sdp` to the empty string. Such
/// descriptions are passed through munging untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// The kind of description.
    #[serde(
        rename = "type",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub typ: Option<SdpType>,

    /// The SDP text.
    #[serde(default)]
    pub sdp: String,
}

impl SessionDescription {
    /// Creates a description of the given type.
    pub fn new(typ: SdpType, sdp: impl Into<String>) -> Self {
        SessionDescription {
            typ: Some(typ),
            sdp: sdp.into(),
        }
    }

    /// Creates an offer.
    pub fn offer(sdp: impl Into<String>) -> Self {
        SessionDescription::new(SdpType::Offer, sdp)
    }

    /// Creates an answer.
    pub fn answer(sdp: impl Into<String>) -> Self {
        SessionDescription::new(SdpType::Answer, sdp)
    }
}

fn empty_as_none<'de, D>(d: D) -> Result<Option<SdpType>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(d)?;
    match s.as_deref() {
        None | Some("") => Ok(None),
        Some(v) => v.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
