//! Simulcast munging of WebRTC session descriptions.
//!
//! This is a Sans I/O library. A [`Simulcast`] instance takes a session
//! description, rewrites the `a=ssrc` and `a=ssrc-group` lines of its video
//! m-lines and hands back a new description. There is no networking, no
//! threads and no async.
//!
//! # Local descriptions
//!
//! A browser only produces one SSRC (plus maybe an RTX SSRC) for a video
//! source. [`Simulcast::munge_local_description`] adds extra layers and the
//! `a=ssrc-group:SIM` grouping them, before the description is given back to
//! `setLocalDescription` and signalled to the remote peer.
//!
//! The generated SSRCs are remembered. When the same source is negotiated
//! again, e.g. after a mute/unmute, the same layers come back. Remote ends
//! key state such as bandwidth estimation on the SSRC values, so they must
//! not change underneath them.
//!
//! ```
//! use simulcast_sdp::{SessionDescription, Simulcast};
//!
//! let mut simulcast = Simulcast::new();
//!
//! let offer = SessionDescription::offer(
//!     "v=0\r\n\
//!     o=- 1 2 IN IP4 127.0.0.1\r\n\
//!     s=-\r\n\
//!     t=0 0\r\n\
//!     m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
//!     a=sendrecv\r\n\
//!     a=ssrc:1000 cname:xeXs3aE9AOBn00yJ\r\n\
//!     a=ssrc:1000 msid:stream track\r\n",
//! );
//!
//! let munged = simulcast.munge_local_description(offer);
//!
//! assert!(munged.sdp.contains("a=ssrc-group:SIM 1000 "));
//! assert_eq!(simulcast.cache().len(), 3);
//! ```
//!
//! # Remote descriptions
//!
//! A remote description with simulcast is normalized for a receiver that
//! doesn't understand SIM groups. Either every layer becomes a stream of its
//! own, or only the lowest layer is kept. See
//! [`SimulcastConfig::set_explode_remote_simulcast`].
//!
//! # Errors
//!
//! Munging never fails. Descriptions that can't be munged, because they are
//! empty, don't parse, or have a source layout we don't handle, come back
//! unchanged. The `try_` variants tell why.
//!
//! # Logging
//!
//! The library logs with [`tracing`]. Enable the `pii` feature to redact
//! cname and msid values from logs.

#![forbid(unsafe_code)]
#![allow(clippy::new_without_default)]
#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

use thiserror::Error;

mod config;
pub use config::SimulcastConfig;

mod conference;

mod desc;
pub use desc::{SdpType, SessionDescription};

mod dir;

mod id;
pub use id::{RandomSsrc, Ssrc, SsrcGenerator};

mod local;
use local::Synthesizer;

mod remote;

mod sdp;
use sdp::{MediaLine, Sdp};
pub use sdp::SdpError;

mod source;

mod util;

/// Reasons a description is passed through unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SimulcastError {
    /// The description has no `type`.
    #[error("session description has no type")]
    MissingType,

    /// The description has an empty `sdp`.
    #[error("session description has no sdp")]
    MissingSdp,

    /// Local simulcast is not supported by the host environment.
    #[error("simulcast not supported")]
    Unsupported,

    /// The SDP didn't parse.
    #[error("{0}")]
    Sdp(#[from] SdpError),
}

/// Simulcast munging for one peer connection.
///
/// Holds the SSRCs of the layers last put on a local video source. Use one
/// instance per peer connection. Local munging takes `&mut self`, so there is
/// at most one negotiation in flight per instance.
#[derive(Debug)]
pub struct Simulcast {
    explode_remote_simulcast: bool,
    simulcast_supported: bool,
    synth: Synthesizer,
}

impl Simulcast {
    /// Creates a new instance with default config.
    ///
    /// Shorthand for `SimulcastConfig::new().build()`.
    pub fn new() -> Self {
        SimulcastConfig::default().build()
    }

    /// Creates a config builder.
    pub fn builder() -> SimulcastConfig {
        SimulcastConfig::new()
    }

    pub(crate) fn new_from_config(
        config: SimulcastConfig,
        generator: Box<dyn SsrcGenerator + Send>,
    ) -> Self {
        Simulcast {
            explode_remote_simulcast: config.explode_remote_simulcast(),
            simulcast_supported: config.simulcast_supported(),
            synth: Synthesizer::new(config.num_of_layers(), generator),
        }
    }

    /// The layers last emitted for the local video source, lowest layer first.
    ///
    /// Empty when no simulcast has been put on a local description.
    pub fn cache(&self) -> &[Ssrc] {
        self.synth.cache().layers()
    }

    /// Forget the layers of the local video source.
    ///
    /// The next local description gets freshly generated layers.
    pub fn clear_cache(&mut self) {
        self.synth.cache_mut().clear();
    }

    /// Decide the layers of the local video source up front.
    ///
    /// When starting muted, the layers are signalled before the browser has
    /// produced a video source. Setting them here makes the first local
    /// description after unmute use the same SSRCs. The first SSRC must be the
    /// one the browser will use for the source.
    pub fn set_cache(&mut self, ssrcs: impl IntoIterator<Item = Ssrc>) {
        self.synth
            .cache_mut()
            .force_set(ssrcs.into_iter().collect());
    }

    /// Normalize simulcast in a description received from the remote peer.
    ///
    /// Returns the description unchanged if it can't be munged.
    pub fn munge_remote_description(&self, desc: SessionDescription) -> SessionDescription {
        match self.try_munge_remote_description(&desc) {
            Ok(munged) => munged,
            Err(e) => {
                debug!("Remote description not munged: {}", e);
                desc
            }
        }
    }

    /// Normalize simulcast in a description received from the remote peer.
    pub fn try_munge_remote_description(
        &self,
        desc: &SessionDescription,
    ) -> Result<SessionDescription, SimulcastError> {
        let typ = validate(desc)?;
        let mut sdp = Sdp::parse(&desc.sdp)?;

        let simulcast_active = !self.synth.cache().is_empty();

        sdp.media_lines = sdp
            .media_lines
            .into_iter()
            .map(|m| {
                if !m.is_video() {
                    return m;
                }
                let m = if self.explode_remote_simulcast {
                    remote::explode(m)
                } else {
                    remote::implode(m)
                };
                conference::annotate(m, simulcast_active)
            })
            .collect();

        Ok(SessionDescription::new(typ, sdp.to_string()))
    }

    /// Add simulcast layers to the video source of a local description.
    ///
    /// Returns the description unchanged if it can't be munged.
    pub fn munge_local_description(&mut self, desc: SessionDescription) -> SessionDescription {
        match self.try_munge_local_description(&desc) {
            Ok(munged) => munged,
            Err(e) => {
                debug!("Local description not munged: {}", e);
                desc
            }
        }
    }

    /// Add simulcast layers to the video source of a local description.
    pub fn try_munge_local_description(
        &mut self,
        desc: &SessionDescription,
    ) -> Result<SessionDescription, SimulcastError> {
        if !self.simulcast_supported {
            return Err(SimulcastError::Unsupported);
        }

        let typ = validate(desc)?;
        let mut sdp = Sdp::parse(&desc.sdp)?;

        let synth = &mut self.synth;

        sdp.media_lines = sdp
            .media_lines
            .into_iter()
            .map(|m| {
                if !m.is_video() {
                    return m;
                }
                let m = munge_local_video(synth, m);
                // The local description is flagged as well as the remote one.
                let simulcast_active = !synth.cache().is_empty();
                conference::annotate(m, simulcast_active)
            })
            .collect();

        Ok(SessionDescription::new(typ, sdp.to_string()))
    }
}

fn munge_local_video(synth: &mut Synthesizer, media: MediaLine) -> MediaLine {
    let dir = media.direction();
    if !dir.is_sending() {
        trace!("Skip local video m-line with direction: {}", dir);
        return media;
    }
    synth.synthesize(media)
}

fn validate(desc: &SessionDescription) -> Result<SdpType, SimulcastError> {
    let typ = desc.typ.ok_or(SimulcastError::MissingType)?;
    if desc.sdp.is_empty() {
        return Err(SimulcastError::MissingSdp);
    }
    Ok(typ)
}
