use combine::EasyParser;
use std::fmt;

use crate::dir::Direction;
use crate::id::Ssrc;
use crate::source::{SourceEntry, SourceGroup};

use super::parser::sdp_parser;
use super::SdpError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sdp {
    pub session: Session,
    pub media_lines: Vec<MediaLine>,
}

impl Sdp {
    pub fn parse(input: &str) -> Result<Sdp, SdpError> {
        let (sdp, rest) = sdp_parser()
            .easy_parse(input)
            .map_err(|e| SdpError::ParseError(e.to_string()))?;

        // A line the grammar doesn't accept ends the parse early. Dropping the
        // rest would silently lose it on write.
        if let Some(line) = rest.lines().find(|l| !l.trim().is_empty()) {
            return Err(SdpError::ParseError(format!("Unexpected line: {line}")));
        }

        Ok(sdp)
    }
}

/// Session info, before the first m= line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub lines: Vec<SdpLine>,
}

/// A `<type>=<value>` line not interpreted any further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdpLine {
    pub typ: char,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLine {
    pub typ: MediaType,
    /// Everything after the media type on the m= line, i.e. port, proto and formats.
    pub desc: String,
    pub attrs: Vec<MediaAttribute>,
}

impl MediaLine {
    pub fn is_video(&self) -> bool {
        self.typ == MediaType::Video
    }

    /// The direction attribute. An m-line without one is `sendrecv`.
    pub fn direction(&self) -> Direction {
        for a in &self.attrs {
            match a {
                MediaAttribute::SendRecv => return Direction::SendRecv,
                MediaAttribute::SendOnly => return Direction::SendOnly,
                MediaAttribute::RecvOnly => return Direction::RecvOnly,
                MediaAttribute::Inactive => return Direction::Inactive,
                _ => {}
            }
        }
        Direction::SendRecv
    }

    /// The a=ssrc lines in order of appearance.
    pub fn sources(&self) -> Vec<SourceEntry> {
        self.attrs
            .iter()
            .filter_map(|a| {
                if let MediaAttribute::Ssrc { ssrc, attr, value } = a {
                    Some(SourceEntry::new(*ssrc, attr, value))
                } else {
                    None
                }
            })
            .collect()
    }

    /// The a=ssrc-group lines in order of appearance.
    pub fn groups(&self) -> Vec<SourceGroup> {
        self.attrs
            .iter()
            .filter_map(|a| {
                if let MediaAttribute::SsrcGroup { semantics, ssrcs } = a {
                    Some(SourceGroup::new(semantics.as_str().into(), ssrcs.clone()))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Replace all a=ssrc-group and a=ssrc lines.
    ///
    /// The new lines, groups first, take the place of the first replaced line.
    /// Without any previous source lines they go last.
    pub fn with_sources(self, groups: Vec<SourceGroup>, entries: Vec<SourceEntry>) -> MediaLine {
        let MediaLine { typ, desc, attrs } = self;

        let at = attrs.iter().position(is_source).unwrap_or(attrs.len());

        let mut kept: Vec<_> = attrs.into_iter().filter(|a| !is_source(a)).collect();
        let tail = kept.split_off(at);

        let sources = groups
            .into_iter()
            .map(MediaAttribute::from)
            .chain(entries.into_iter().map(MediaAttribute::from));

        kept.extend(sources);
        kept.extend(tail);

        MediaLine {
            typ,
            desc,
            attrs: kept,
        }
    }
}

fn is_source(a: &MediaAttribute) -> bool {
    matches!(
        a,
        MediaAttribute::Ssrc { .. } | MediaAttribute::SsrcGroup { .. }
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaType {
    Audio,
    Video,
    Application,
    Unknown(String),
}

impl<'a> From<&'a str> for MediaType {
    fn from(v: &'a str) -> Self {
        match v {
            "audio" => MediaType::Audio,
            "video" => MediaType::Video,
            "application" => MediaType::Application,
            _ => MediaType::Unknown(v.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaAttribute {
    RecvOnly,
    SendRecv,
    SendOnly,
    Inactive,
    SsrcGroup {
        semantics: String,
        ssrcs: Vec<Ssrc>,
    },
    Ssrc {
        ssrc: Ssrc,
        attr: String,
        value: String,
    },
    /// Any other a= line, without the `a=`.
    Unused(String),
    /// A non a= line inside the media section, such as c= or b=.
    Line(SdpLine),
}

impl From<Direction> for MediaAttribute {
    fn from(v: Direction) -> Self {
        match v {
            Direction::SendOnly => MediaAttribute::SendOnly,
            Direction::RecvOnly => MediaAttribute::RecvOnly,
            Direction::SendRecv => MediaAttribute::SendRecv,
            Direction::Inactive => MediaAttribute::Inactive,
        }
    }
}

impl From<SourceEntry> for MediaAttribute {
    fn from(v: SourceEntry) -> Self {
        MediaAttribute::Ssrc {
            ssrc: v.ssrc,
            attr: v.attribute,
            value: v.value,
        }
    }
}

impl From<SourceGroup> for MediaAttribute {
    fn from(v: SourceGroup) -> Self {
        MediaAttribute::SsrcGroup {
            semantics: v.semantics.to_string(),
            ssrcs: v.ssrcs,
        }
    }
}

impl fmt::Display for Sdp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.session)?;
        for m in &self.media_lines {
            write!(f, "{m}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for l in &self.lines {
            write!(f, "{l}")?;
        }
        Ok(())
    }
}

impl fmt::Display for SdpLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}\r\n", self.typ, self.value)
    }
}

impl fmt::Display for MediaLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m={} {}\r\n", self.typ, self.desc)?;
        for a in &self.attrs {
            write!(f, "{a}")?;
        }
        Ok(())
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Audio => write!(f, "audio"),
            MediaType::Video => write!(f, "video"),
            MediaType::Application => write!(f, "application"),
            MediaType::Unknown(v) => write!(f, "{v}"),
        }
    }
}

impl fmt::Display for MediaAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use MediaAttribute::*;
        match self {
            RecvOnly => write!(f, "a=recvonly\r\n")?,
            SendRecv => write!(f, "a=sendrecv\r\n")?,
            SendOnly => write!(f, "a=sendonly\r\n")?,
            Inactive => write!(f, "a=inactive\r\n")?,
            SsrcGroup { semantics, ssrcs } => {
                write!(f, "a=ssrc-group:{semantics}")?;
                for ssrc in ssrcs {
                    write!(f, " {ssrc}")?;
                }
                write!(f, "\r\n")?;
            }
            Ssrc { ssrc, attr, value } => write!(f, "a=ssrc:{ssrc} {attr}:{value}\r\n")?,
            Unused(v) => write!(f, "a={v}\r\n")?,
            Line(v) => write!(f, "{v}")?,
        }
        Ok(())
    }
}
