//! Simulcast synthesis for a local (outgoing) m-line.
//!
//! The browser hands us an m-line with a single video source, possibly with
//! RTX. We add the extra layers and the `a=ssrc-group:SIM` the remote expects.
//! Layers generated once are remembered, so that a renegotiation of the same
//! source (think mute/unmute) presents the very same SSRCs again.

use std::fmt;

use crate::id::{Ssrc, SsrcGenerator};
use crate::sdp::MediaLine;
use crate::source::{SourceEntry, SourceGroup, SourceMap};
use crate::util::Pii;

/// Layers last emitted by the [`Synthesizer`], lowest layer first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulcastCache {
    layers: Vec<Ssrc>,
    /// (layer, rtx) pairs last emitted.
    rtx: Vec<(Ssrc, Ssrc)>,
}

impl SimulcastCache {
    pub fn layers(&self) -> &[Ssrc] {
        &self.layers
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn contains(&self, ssrc: Ssrc) -> bool {
        self.layers.contains(&ssrc)
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.rtx.clear();
    }

    /// Overwrite the layers, e.g. with SSRCs signalled while the source was muted.
    pub fn force_set(&mut self, layers: Vec<Ssrc>) {
        self.layers = layers;
        self.rtx.clear();
    }

    fn rtx_for(&self, layer: Ssrc) -> Option<Ssrc> {
        self.rtx.iter().find(|(l, _)| *l == layer).map(|(_, r)| *r)
    }

    fn update(&mut self, layers: Vec<Ssrc>, groups: &[SourceGroup]) {
        self.rtx = groups
            .iter()
            .filter(|g| g.is_fid() && g.ssrcs.len() == 2 && layers.contains(&g.ssrcs[0]))
            .map(|g| (g.ssrcs[0], g.ssrcs[1]))
            .collect();
        self.layers = layers;
    }
}

/// Index aligned mapping from newly negotiated layers to cached layers.
#[derive(Debug)]
struct LayerMap {
    replace: Vec<(Ssrc, Option<Ssrc>)>,
    /// Cached layers nothing maps to.
    additions: Vec<Ssrc>,
}

impl LayerMap {
    fn new(new_layers: &[Ssrc], cached: &[Ssrc]) -> Self {
        let replace: Vec<_> = new_layers
            .iter()
            .enumerate()
            .map(|(i, ssrc)| (*ssrc, cached.get(i).copied()))
            .collect();

        let additions = cached
            .iter()
            .filter(|c| !replace.iter().any(|(_, to)| *to == Some(**c)))
            .copied()
            .collect();

        LayerMap { replace, additions }
    }

    fn get(&self, ssrc: Ssrc) -> Option<Ssrc> {
        self.replace
            .iter()
            .find(|(from, _)| *from == ssrc)
            .and_then(|(_, to)| *to)
    }

    fn apply(&self, ssrc: Ssrc) -> Ssrc {
        self.get(ssrc).unwrap_or(ssrc)
    }
}

/// The source layout we know how to put simulcast on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Topology {
    primary: Ssrc,
    doing_rtx: bool,
}

impl Topology {
    /// One SSRC, or two SSRCs paired by FID.
    fn detect(entries: &[SourceEntry], groups: &[SourceGroup]) -> Option<Topology> {
        let mut ssrcs: Vec<Ssrc> = vec![];
        for e in entries {
            if !ssrcs.contains(&e.ssrc) {
                ssrcs.push(e.ssrc);
            }
        }

        match ssrcs.len() {
            1 => Some(Topology {
                primary: ssrcs[0],
                doing_rtx: false,
            }),
            2 => {
                let fid = groups.iter().find(|g| {
                    g.is_fid() && g.ssrcs.len() == 2 && ssrcs.iter().all(|s| g.contains(*s))
                })?;
                Some(Topology {
                    primary: fid.ssrcs[0],
                    doing_rtx: true,
                })
            }
            _ => None,
        }
    }
}

/// Adds simulcast layers to local m-lines and owns the [`SimulcastCache`].
pub struct Synthesizer {
    num_of_layers: usize,
    cache: SimulcastCache,
    generator: Box<dyn SsrcGenerator + Send>,
}

impl Synthesizer {
    pub fn new(num_of_layers: usize, generator: Box<dyn SsrcGenerator + Send>) -> Self {
        Synthesizer {
            num_of_layers,
            cache: SimulcastCache::default(),
            generator,
        }
    }

    pub fn cache(&self) -> &SimulcastCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut SimulcastCache {
        &mut self.cache
    }

    /// Add simulcast to the m-line, or restore the previously generated layers.
    ///
    /// Unsupported source layouts are returned as is.
    pub fn synthesize(&mut self, media: MediaLine) -> MediaLine {
        if self.num_of_layers < 2 {
            return media;
        }

        let entries = media.sources();
        let groups = media.groups();

        let Some(topology) = Topology::detect(&entries, &groups) else {
            debug!(
                "Unsupported source layout ({} lines, {} groups), leaving m-line untouched",
                entries.len(),
                groups.len()
            );
            return media;
        };

        let (groups, entries) = if self.cache.contains(topology.primary) {
            self.restore(topology, groups, entries)
        } else {
            self.generate(topology, groups, entries)
        };

        let media = media.with_sources(groups, entries);

        // The cache reflects what we just emitted.
        let groups = media.groups();
        let layers = layers_of(&groups, topology.primary);
        self.cache.update(layers, &groups);

        media
    }

    fn generate(
        &mut self,
        topology: Topology,
        mut groups: Vec<SourceGroup>,
        mut entries: Vec<SourceEntry>,
    ) -> (Vec<SourceGroup>, Vec<SourceEntry>) {
        let Topology { primary, doing_rtx } = topology;

        let identity = Identity::of(&entries, primary);

        // A stale SIM group would shadow the one we emit.
        groups.retain(|g| !g.is_sim());

        let layers: Vec<Ssrc> = (1..self.num_of_layers)
            .map(|_| self.generator.generate())
            .collect();

        for layer in &layers {
            identity.add_to(&mut entries, *layer);
        }

        let mut sim = vec![primary];
        sim.extend(&layers);
        debug!("Generated simulcast layers {:?}", sim);
        groups.push(SourceGroup::sim(sim));

        if doing_rtx {
            for layer in &layers {
                let rtx = self.generator.generate();
                identity.add_to(&mut entries, rtx);
                groups.push(SourceGroup::fid(*layer, rtx));
            }
        }

        (groups, entries)
    }

    fn restore(
        &mut self,
        topology: Topology,
        groups: Vec<SourceGroup>,
        entries: Vec<SourceEntry>,
    ) -> (Vec<SourceGroup>, Vec<SourceEntry>) {
        let new_layers = layers_of(&groups, topology.primary);
        let identity = Identity::of(&entries, new_layers[0]);
        let map = LayerMap::new(&new_layers, self.cache.layers());

        debug!(
            "Restoring simulcast layers {:?} for {:?}",
            self.cache.layers(),
            new_layers
        );

        let mut entries: Vec<SourceEntry> = entries
            .into_iter()
            .map(|mut e| {
                e.ssrc = map.apply(e.ssrc);
                e
            })
            .collect();

        // Replacing can make two SSRCs one.
        let mut seen = vec![];
        entries.retain(|e| {
            let key = (e.ssrc, e.attribute.clone());
            let first = !seen.contains(&key);
            seen.push(key);
            first
        });

        let mut groups: Vec<SourceGroup> = groups
            .into_iter()
            .filter(|g| !g.is_sim())
            .map(|mut g| {
                for s in &mut g.ssrcs {
                    *s = map.apply(*s);
                }
                g
            })
            .collect();

        let mut sim: Vec<Ssrc> = vec![];
        for layer in new_layers.iter().map(|s| map.apply(*s)) {
            if !sim.contains(&layer) {
                sim.push(layer);
            }
        }

        let mut rtx_groups = vec![];
        for layer in &map.additions {
            identity.add_to(&mut entries, *layer);
            sim.push(*layer);

            if topology.doing_rtx {
                let rtx = self
                    .cache
                    .rtx_for(*layer)
                    .unwrap_or_else(|| self.generator.generate());
                identity.add_to(&mut entries, rtx);
                rtx_groups.push(SourceGroup::fid(*layer, rtx));
            }
        }

        groups.push(SourceGroup::sim(sim));
        groups.extend(rtx_groups);

        (groups, entries)
    }
}

impl fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synthesizer")
            .field("num_of_layers", &self.num_of_layers)
            .field("cache", &self.cache)
            .finish()
    }
}

/// Layers in simulcast order. Just the primary without a SIM group.
fn layers_of(groups: &[SourceGroup], primary: Ssrc) -> Vec<Ssrc> {
    groups
        .iter()
        .find(|g| g.is_sim() && !g.ssrcs.is_empty())
        .map(|g| g.ssrcs.clone())
        .unwrap_or_else(|| vec![primary])
}

/// The msid and cname every layer of a stream shares.
struct Identity {
    msid: Option<String>,
    cname: Option<String>,
}

impl Identity {
    fn of(entries: &[SourceEntry], ssrc: Ssrc) -> Self {
        let map = SourceMap::from_entries(entries);
        Identity {
            msid: map.get(ssrc, "msid").map(String::from),
            cname: map.get(ssrc, "cname").map(String::from),
        }
    }

    fn add_to(&self, entries: &mut Vec<SourceEntry>, ssrc: Ssrc) {
        trace!("Add {} cname {:?}", ssrc, Pii(&self.cname));
        if let Some(cname) = &self.cname {
            entries.push(SourceEntry::new(ssrc, "cname", cname));
        }
        if let Some(msid) = &self.msid {
            entries.push(SourceEntry::new(ssrc, "msid", msid));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sdp::Sdp;

    fn video(attrs: &str) -> MediaLine {
        let sdp = format!("v=0\r\nm=video 9 UDP/TLS/RTP/SAVPF 96 97\r\na=sendrecv\r\n{attrs}");
        Sdp::parse(&sdp).unwrap().media_lines.remove(0)
    }

    fn counting(start: u32) -> Box<dyn SsrcGenerator + Send> {
        let mut next = start;
        Box::new(move || {
            next += 1;
            Ssrc::from(next)
        })
    }

    fn ssrcs(values: &[u32]) -> Vec<Ssrc> {
        values.iter().copied().map(Ssrc::from).collect()
    }

    fn sim_group(m: &MediaLine) -> Option<Vec<u32>> {
        m.groups()
            .into_iter()
            .find(|g| g.is_sim())
            .map(|g| g.ssrcs.iter().map(|s| **s).collect())
    }

    const SINGLE: &str = "a=ssrc:1000 cname:c\r\na=ssrc:1000 msid:s t\r\n";

    const WITH_RTX: &str = "a=ssrc-group:FID 1000 1001\r\n\
        a=ssrc:1000 cname:c\r\n\
        a=ssrc:1000 msid:s t\r\n\
        a=ssrc:1001 cname:c\r\n\
        a=ssrc:1001 msid:s t\r\n";

    #[test]
    fn generate_layers() {
        let mut s = Synthesizer::new(3, counting(10));
        let m = s.synthesize(video(SINGLE));

        assert_eq!(sim_group(&m), Some(vec![1000, 11, 12]));
        assert_eq!(m.sources().len(), 6);
        assert_eq!(s.cache().layers(), ssrcs(&[1000, 11, 12]));

        let map = SourceMap::from_entries(&m.sources());
        assert_eq!(map.get(11.into(), "msid"), Some("s t"));
        assert_eq!(map.get(12.into(), "cname"), Some("c"));
    }

    #[test]
    fn generate_layers_with_rtx() {
        let mut s = Synthesizer::new(3, counting(10));
        let m = s.synthesize(video(WITH_RTX));

        let groups = m.groups();
        assert_eq!(
            groups,
            vec![
                SourceGroup::fid(1000.into(), 1001.into()),
                SourceGroup::sim(vec![1000.into(), 11.into(), 12.into()]),
                SourceGroup::fid(11.into(), 13.into()),
                SourceGroup::fid(12.into(), 14.into()),
            ]
        );
        assert_eq!(m.sources().len(), 12);
    }

    #[test]
    fn restore_is_stable() {
        let mut s = Synthesizer::new(3, counting(10));
        let first = s.synthesize(video(SINGLE));
        let second = s.synthesize(video(SINGLE));

        assert_eq!(sim_group(&second), Some(vec![1000, 11, 12]));
        assert_eq!(first.groups(), second.groups());
        assert_eq!(s.cache().layers(), ssrcs(&[1000, 11, 12]));
    }

    #[test]
    fn restore_with_rtx_reuses_rtx() {
        let mut s = Synthesizer::new(3, counting(10));
        let first = s.synthesize(video(WITH_RTX));
        let second = s.synthesize(video(WITH_RTX));

        assert_eq!(first.groups(), second.groups());
        assert_eq!(first.sources().len(), second.sources().len());
    }

    #[test]
    fn generate_replaces_existing_sim_group() {
        let mut s = Synthesizer::new(3, counting(10));
        let m = s.synthesize(video(&format!("a=ssrc-group:SIM 1000\r\n{SINGLE}")));

        let sims: Vec<_> = m.groups().into_iter().filter(|g| g.is_sim()).collect();
        assert_eq!(sims, vec![SourceGroup::sim(ssrcs(&[1000, 11, 12]))]);
        assert_eq!(s.cache().layers(), ssrcs(&[1000, 11, 12]));

        let again = s.synthesize(video(SINGLE));
        assert_eq!(sim_group(&again), Some(vec![1000, 11, 12]));
    }

    #[test]
    fn restore_short_cache_adds_nothing() {
        let mut s = Synthesizer::new(3, counting(10));
        s.cache_mut().force_set(ssrcs(&[1000]));

        let m = s.synthesize(video(SINGLE));

        assert_eq!(sim_group(&m), Some(vec![1000]));
        assert_eq!(m.sources().len(), 2);
        assert_eq!(s.cache().layers(), ssrcs(&[1000]));
    }

    #[test]
    fn restore_keeps_layers_beyond_cache() {
        let mut s = Synthesizer::new(3, counting(10));
        s.cache_mut().force_set(ssrcs(&[1000, 5000]));

        let m = s.synthesize(video(&format!(
            "a=ssrc-group:SIM 1000 2000 3000\r\n{SINGLE}"
        )));

        assert_eq!(sim_group(&m), Some(vec![1000, 5000, 3000]));
        assert_eq!(s.cache().layers(), ssrcs(&[1000, 5000, 3000]));

        let again = s.synthesize(video(SINGLE));
        assert_eq!(sim_group(&again), Some(vec![1000, 5000, 3000]));
    }

    #[test]
    fn restore_takes_new_identity() {
        let mut s = Synthesizer::new(3, counting(10));
        s.synthesize(video(SINGLE));
        let m = s.synthesize(video("a=ssrc:1000 cname:c2\r\na=ssrc:1000 msid:s2 t2\r\n"));

        let map = SourceMap::from_entries(&m.sources());
        assert_eq!(map.get(11.into(), "msid"), Some("s2 t2"));
        assert_eq!(map.get(12.into(), "cname"), Some("c2"));
    }

    #[test]
    fn forced_cache_is_restored() {
        let mut s = Synthesizer::new(3, counting(10));
        s.cache_mut()
            .force_set(vec![1000.into(), 2000.into(), 3000.into()]);

        let m = s.synthesize(video(SINGLE));
        assert_eq!(sim_group(&m), Some(vec![1000, 2000, 3000]));
    }

    #[test]
    fn forced_cache_replaces_primary() {
        let mut s = Synthesizer::new(3, counting(10));
        s.cache_mut()
            .force_set(vec![500.into(), 1000.into(), 3000.into()]);

        let m = s.synthesize(video(SINGLE));
        assert_eq!(sim_group(&m), Some(vec![500, 1000, 3000]));

        let map = SourceMap::from_entries(&m.sources());
        assert_eq!(map.get(500.into(), "msid"), Some("s t"));
        assert_eq!(map.get(1000.into(), "msid"), Some("s t"));
        assert_eq!(s.cache().layers(), ssrcs(&[500, 1000, 3000]));
    }

    #[test]
    fn cache_miss_after_clear() {
        let mut s = Synthesizer::new(3, counting(10));
        s.synthesize(video(SINGLE));
        s.cache_mut().clear();

        let m = s.synthesize(video(SINGLE));
        assert_eq!(sim_group(&m), Some(vec![1000, 13, 14]));
    }

    #[test]
    fn two_ssrcs_without_fid_untouched() {
        let input = video("a=ssrc:1 cname:c\r\na=ssrc:2 cname:c\r\n");
        let mut s = Synthesizer::new(3, counting(10));

        assert_eq!(s.synthesize(input.clone()), input);
        assert!(s.cache().is_empty());
    }

    #[test]
    fn fid_not_covering_ssrcs_untouched() {
        let input = video("a=ssrc-group:FID 1 3\r\na=ssrc:1 cname:c\r\na=ssrc:2 cname:c\r\n");
        let mut s = Synthesizer::new(3, counting(10));

        assert_eq!(s.synthesize(input.clone()), input);
    }

    #[test]
    fn no_or_many_ssrcs_untouched() {
        let mut s = Synthesizer::new(3, counting(10));

        let none = video("a=mid:1\r\n");
        assert_eq!(s.synthesize(none.clone()), none);

        let many = video("a=ssrc:1 cname:c\r\na=ssrc:2 cname:c\r\na=ssrc:3 cname:c\r\n");
        assert_eq!(s.synthesize(many.clone()), many);

        assert!(s.cache().is_empty());
    }

    #[test]
    fn single_layer_is_passthrough() {
        let mut s = Synthesizer::new(1, counting(10));
        let input = video(SINGLE);

        assert_eq!(s.synthesize(input.clone()), input);
        assert!(s.cache().is_empty());
    }

    #[test]
    fn layer_map_additions() {
        let map = LayerMap::new(&[1.into()], &[1.into(), 2.into(), 3.into()]);
        assert_eq!(map.get(1.into()), Some(1.into()));
        assert_eq!(map.additions, ssrcs(&[2, 3]));

        let map = LayerMap::new(&[1.into(), 4.into()], &[1.into()]);
        assert_eq!(map.get(4.into()), None);
        assert_eq!(map.apply(4.into()), 4.into());
        assert!(map.additions.is_empty());
    }
}
