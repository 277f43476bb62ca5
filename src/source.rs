use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::id::Ssrc;

/// One `a=ssrc:<ssrc> <attribute>:<value>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub ssrc: Ssrc,
    pub attribute: String,
    pub value: String,
}

impl SourceEntry {
    pub fn new(ssrc: Ssrc, attribute: &str, value: &str) -> Self {
        SourceEntry {
            ssrc,
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }
}

/// Semantics of an `a=ssrc-group` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Semantics {
    /// Simulcast layers of one stream, lowest layer first.
    Sim,
    /// A (primary, retransmission) pair.
    Fid,
    Other(String),
}

impl<'a> From<&'a str> for Semantics {
    fn from(v: &'a str) -> Self {
        match v {
            "SIM" => Semantics::Sim,
            "FID" => Semantics::Fid,
            _ => Semantics::Other(v.into()),
        }
    }
}

impl fmt::Display for Semantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Semantics::Sim => write!(f, "SIM"),
            Semantics::Fid => write!(f, "FID"),
            Semantics::Other(v) => write!(f, "{v}"),
        }
    }
}

/// One `a=ssrc-group:<semantics> <ssrc>...` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceGroup {
    pub semantics: Semantics,
    pub ssrcs: Vec<Ssrc>,
}

impl SourceGroup {
    pub fn new(semantics: Semantics, ssrcs: Vec<Ssrc>) -> Self {
        SourceGroup { semantics, ssrcs }
    }

    pub fn sim(ssrcs: Vec<Ssrc>) -> Self {
        SourceGroup::new(Semantics::Sim, ssrcs)
    }

    pub fn fid(primary: Ssrc, rtx: Ssrc) -> Self {
        SourceGroup::new(Semantics::Fid, vec![primary, rtx])
    }

    pub fn is_sim(&self) -> bool {
        self.semantics == Semantics::Sim
    }

    pub fn is_fid(&self) -> bool {
        self.semantics == Semantics::Fid
    }

    pub fn contains(&self, ssrc: Ssrc) -> bool {
        self.ssrcs.contains(&ssrc)
    }
}

/// Source attributes of one m-line keyed by SSRC.
///
/// Iterates in ascending SSRC order. The attributes of each SSRC keep the
/// order they were first seen in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    sources: BTreeMap<Ssrc, Vec<(String, String)>>,
}

impl SourceMap {
    pub fn from_entries(entries: &[SourceEntry]) -> Self {
        let mut map = SourceMap::default();
        for e in entries {
            map.sources
                .entry(e.ssrc)
                .or_default()
                .push((e.attribute.clone(), e.value.clone()));
        }
        map
    }

    pub fn contains(&self, ssrc: Ssrc) -> bool {
        self.sources.contains_key(&ssrc)
    }

    pub fn get(&self, ssrc: Ssrc, attribute: &str) -> Option<&str> {
        self.sources
            .get(&ssrc)?
            .iter()
            .find(|(a, _)| a == attribute)
            .map(|(_, v)| v.as_str())
    }

    /// Set the value of an attribute, adding the SSRC if it is new.
    pub fn set(&mut self, ssrc: Ssrc, attribute: &str, value: &str) {
        let attrs = self.sources.entry(ssrc).or_default();
        if let Some((_, v)) = attrs.iter_mut().find(|(a, _)| a == attribute) {
            *v = value.to_string();
        } else {
            attrs.push((attribute.to_string(), value.to_string()));
        }
    }

    pub fn remove(&mut self, ssrc: Ssrc) {
        self.sources.remove(&ssrc);
    }

    /// Flatten back to a=ssrc lines.
    ///
    /// SSRCs in `order` come first, in that order. The rest follow in
    /// ascending SSRC order. SSRCs in `order` that aren't in the map are
    /// skipped.
    pub fn rebuild(&self, order: Option<&[Ssrc]>) -> Vec<SourceEntry> {
        let mut seen = HashSet::new();

        let ordered = order
            .unwrap_or_default()
            .iter()
            .chain(self.sources.keys())
            .filter(|ssrc| seen.insert(**ssrc));

        let mut entries = vec![];
        for ssrc in ordered {
            let Some(attrs) = self.sources.get(ssrc) else {
                continue;
            };
            entries.extend(attrs.iter().map(|(a, v)| SourceEntry::new(*ssrc, a, v)));
        }
        entries
    }
}
