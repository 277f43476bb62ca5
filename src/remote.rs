//! Normalization of simulcast in a remote m-line.
//!
//! A receiver that can't handle `a=ssrc-group:SIM` gets either every layer as
//! a stream of its own ([`explode`]), or only the lowest layer ([`implode`]).

use std::collections::HashSet;

use crate::id::Ssrc;
use crate::sdp::MediaLine;
use crate::source::{SourceGroup, SourceMap};
use crate::util::Pii;

/// Turn each simulcast layer into an independent stream.
///
/// Layer `i` gets `/i` appended to both msid tokens and the cname. Members of
/// other groups with the layer (i.e. its RTX) take over the layer's identity.
/// The SIM groups are removed, other groups are kept.
pub fn explode(media: MediaLine) -> MediaLine {
    let groups = media.groups();

    let Some(sims) = sim_groups(&groups) else {
        return media;
    };
    if sims.is_empty() {
        return media;
    }

    let mut sources = SourceMap::from_entries(&media.sources());
    let mut order: Vec<Ssrc> = vec![];

    for sim in sims {
        debug!("Exploding SIM group: {:?}", sim.ssrcs);

        for (i, ssrc) in sim.ssrcs.iter().copied().enumerate() {
            order.push(ssrc);

            let msid = sources.get(ssrc, "msid").map(|m| layer_msid(m, i));
            let cname = sources.get(ssrc, "cname").map(|c| format!("{c}/{i}"));

            let related = groups.iter().filter(|g| !g.is_sim() && g.contains(ssrc));
            let members = related.flat_map(|g| g.ssrcs.iter().copied());

            for member in std::iter::once(ssrc).chain(members) {
                if !sources.contains(member) {
                    continue;
                }
                if let Some(msid) = &msid {
                    sources.set(member, "msid", msid);
                }
                if let Some(cname) = &cname {
                    sources.set(member, "cname", cname);
                }
                if member != ssrc {
                    order.push(member);
                }
            }

            trace!("Layer {} ssrc {} msid {:?}", i, ssrc, Pii(&msid));
        }
    }

    let entries = sources.rebuild(Some(&order[..]));
    let groups = groups.into_iter().filter(|g| !g.is_sim()).collect();

    media.with_sources(groups, entries)
}

/// Keep only the lowest simulcast layer.
///
/// Every higher layer is removed together with all groups it is part of, and
/// the sources of those groups (i.e. the layer's RTX).
pub fn implode(media: MediaLine) -> MediaLine {
    let groups = media.groups();

    let Some(sims) = sim_groups(&groups) else {
        return media;
    };
    if sims.is_empty() {
        return media;
    }

    let mut sources = SourceMap::from_entries(&media.sources());

    // Indexes into groups, decided before anything is removed.
    let mut dropped: HashSet<usize> = HashSet::new();

    for (idx, sim) in groups.iter().enumerate().filter(|(_, g)| g.is_sim()) {
        debug!("Imploding SIM group: {:?}", sim.ssrcs);
        dropped.insert(idx);

        for ssrc in sim.ssrcs.iter().skip(1).copied() {
            sources.remove(ssrc);

            let related = groups
                .iter()
                .enumerate()
                .filter(|(_, g)| !g.is_sim() && g.contains(ssrc));

            for (ridx, g) in related {
                for member in &g.ssrcs {
                    sources.remove(*member);
                }
                dropped.insert(ridx);
            }
        }
    }

    let entries = sources.rebuild(None);
    let groups = groups
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| !dropped.contains(idx))
        .map(|(_, g)| g)
        .collect();

    media.with_sources(groups, entries)
}

/// The SIM groups of an m-line.
///
/// `None` if two SIM groups share an SSRC, which makes the m-line malformed.
fn sim_groups(groups: &[SourceGroup]) -> Option<Vec<&SourceGroup>> {
    let sims: Vec<_> = groups.iter().filter(|g| g.is_sim()).collect();

    let mut seen = HashSet::new();
    for sim in &sims {
        // Within one group a repeat isn't a conflict between groups.
        let distinct: HashSet<Ssrc> = sim.ssrcs.iter().copied().collect();
        if distinct.iter().any(|s| !seen.insert(*s)) {
            warn!("SIM groups overlap, leaving m-line untouched: {:?}", sims);
            return None;
        }
    }

    Some(sims)
}

/// `stream track` -> `stream/i track/i`
fn layer_msid(msid: &str, i: usize) -> String {
    match msid.split_once(' ') {
        Some((stream, track)) => format!("{stream}/{i} {track}/{i}"),
        None => format!("{msid}/{i}"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sdp::Sdp;

    fn video(attrs: &str) -> MediaLine {
        let sdp = format!("v=0\r\nm=video 9 UDP/TLS/RTP/SAVPF 96 97\r\na=mid:1\r\n{attrs}");
        Sdp::parse(&sdp).unwrap().media_lines.remove(0)
    }

    fn ssrc_lines(m: &MediaLine) -> String {
        m.to_string()
            .lines()
            .filter(|l| l.starts_with("a=ssrc"))
            .map(|l| format!("{l}\n"))
            .collect()
    }

    const SIM_WITH_RTX: &str = "a=ssrc-group:SIM 1 2 3\r\n\
        a=ssrc-group:FID 1 11\r\n\
        a=ssrc-group:FID 2 22\r\n\
        a=ssrc-group:FID 3 33\r\n\
        a=ssrc:1 cname:c\r\n\
        a=ssrc:1 msid:s t\r\n\
        a=ssrc:11 cname:c\r\n\
        a=ssrc:11 msid:s t\r\n\
        a=ssrc:2 cname:c\r\n\
        a=ssrc:2 msid:s t\r\n\
        a=ssrc:22 cname:c\r\n\
        a=ssrc:22 msid:s t\r\n\
        a=ssrc:3 cname:c\r\n\
        a=ssrc:3 msid:s t\r\n\
        a=ssrc:33 cname:c\r\n\
        a=ssrc:33 msid:s t\r\n";

    #[test]
    fn explode_layers_with_rtx() {
        let m = explode(video(SIM_WITH_RTX));

        assert_eq!(
            ssrc_lines(&m),
            "a=ssrc-group:FID 1 11\n\
            a=ssrc-group:FID 2 22\n\
            a=ssrc-group:FID 3 33\n\
            a=ssrc:1 cname:c/0\n\
            a=ssrc:1 msid:s/0 t/0\n\
            a=ssrc:11 cname:c/0\n\
            a=ssrc:11 msid:s/0 t/0\n\
            a=ssrc:2 cname:c/1\n\
            a=ssrc:2 msid:s/1 t/1\n\
            a=ssrc:22 cname:c/1\n\
            a=ssrc:22 msid:s/1 t/1\n\
            a=ssrc:3 cname:c/2\n\
            a=ssrc:3 msid:s/2 t/2\n\
            a=ssrc:33 cname:c/2\n\
            a=ssrc:33 msid:s/2 t/2\n"
        );
    }

    #[test]
    fn explode_is_idempotent() {
        let once = explode(video(SIM_WITH_RTX));
        let twice = explode(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn explode_keeps_unrelated_stream() {
        let m = explode(video(
            "a=ssrc-group:SIM 1 2\r\n\
            a=ssrc:5 cname:other\r\n\
            a=ssrc:1 cname:c\r\n\
            a=ssrc:2 cname:c\r\n",
        ));

        assert_eq!(
            ssrc_lines(&m),
            "a=ssrc:1 cname:c/0\n\
            a=ssrc:2 cname:c/1\n\
            a=ssrc:5 cname:other\n"
        );
    }

    #[test]
    fn explode_single_token_msid() {
        assert_eq!(layer_msid("stream", 2), "stream/2");
        assert_eq!(layer_msid("stream track", 1), "stream/1 track/1");
    }

    #[test]
    fn implode_layers_with_rtx() {
        let m = implode(video(SIM_WITH_RTX));

        assert_eq!(
            ssrc_lines(&m),
            "a=ssrc-group:FID 1 11\n\
            a=ssrc:1 cname:c\n\
            a=ssrc:1 msid:s t\n\
            a=ssrc:11 cname:c\n\
            a=ssrc:11 msid:s t\n"
        );
    }

    #[test]
    fn implode_is_idempotent() {
        let once = implode(video(SIM_WITH_RTX));
        let twice = implode(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn no_groups_is_noop() {
        let m = video("a=ssrc:2 cname:c\r\na=ssrc:1 cname:c\r\n");
        assert_eq!(explode(m.clone()), m);
        assert_eq!(implode(m.clone()), m);
    }

    #[test]
    fn disjoint_sim_groups_both_processed() {
        let m = implode(video(
            "a=ssrc-group:SIM 1 2\r\n\
            a=ssrc-group:SIM 5 6\r\n\
            a=ssrc:1 cname:a\r\n\
            a=ssrc:2 cname:a\r\n\
            a=ssrc:5 cname:b\r\n\
            a=ssrc:6 cname:b\r\n",
        ));

        assert_eq!(ssrc_lines(&m), "a=ssrc:1 cname:a\na=ssrc:5 cname:b\n");
    }

    #[test]
    fn overlapping_sim_groups_untouched() {
        let m = video(
            "a=ssrc-group:SIM 1 2\r\n\
            a=ssrc-group:SIM 2 3\r\n\
            a=ssrc:1 cname:a\r\n\
            a=ssrc:2 cname:a\r\n\
            a=ssrc:3 cname:a\r\n",
        );
        assert_eq!(explode(m.clone()), m);
        assert_eq!(implode(m.clone()), m);
    }
}
