#![allow(unused)]
use std::sync::Once;

use simulcast_sdp::{SessionDescription, Ssrc, SsrcGenerator};

pub fn init_log() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    static START: Once = Once::new();

    START.call_once(|| {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(env_filter)
            .init();
    });
}

/// Hands out 1, 2, 3... after `start`.
pub fn counting(start: u32) -> impl SsrcGenerator + Send + 'static {
    let mut next = start;
    move || {
        next += 1;
        Ssrc::from(next)
    }
}

pub const SESSION: &str = "v=0\r\n\
    o=- 6564425948916445306 2 IN IP4 127.0.0.1\r\n\
    s=-\r\n\
    t=0 0\r\n\
    a=group:BUNDLE 0 1\r\n\
    a=msid-semantic: WMS stream\r\n";

pub const AUDIO: &str = "m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
    c=IN IP4 0.0.0.0\r\n\
    a=mid:0\r\n\
    a=sendrecv\r\n\
    a=rtpmap:111 opus/48000/2\r\n\
    a=ssrc:3948621874 cname:xeXs3aE9AOBn00yJ\r\n\
    a=ssrc:3948621874 msid:stream audio\r\n";

/// A video m-line with `direction` and the given source lines.
pub fn video(direction: &str, sources: &str) -> String {
    format!(
        "m=video 9 UDP/TLS/RTP/SAVPF 96 97\r\n\
        c=IN IP4 0.0.0.0\r\n\
        a=mid:1\r\n\
        a={direction}\r\n\
        a=rtpmap:96 VP8/90000\r\n\
        a=rtpmap:97 rtx/90000\r\n\
        a=fmtp:97 apt=96\r\n\
        {sources}"
    )
}

pub fn offer(video: &str) -> SessionDescription {
    SessionDescription::offer(format!("{SESSION}{AUDIO}{video}"))
}

pub fn answer(video: &str) -> SessionDescription {
    SessionDescription::answer(format!("{SESSION}{AUDIO}{video}"))
}

/// The a=ssrc and a=ssrc-group lines of the description.
pub fn source_lines(desc: &SessionDescription) -> Vec<String> {
    desc.sdp
        .lines()
        .filter(|l| l.starts_with("a=ssrc"))
        .map(String::from)
        .collect()
}

/// Members of the SIM group, if there is one.
pub fn sim_group(desc: &SessionDescription) -> Option<Vec<u32>> {
    let line = desc
        .sdp
        .lines()
        .find(|l| l.starts_with("a=ssrc-group:SIM "))?;
    Some(
        line["a=ssrc-group:SIM ".len()..]
            .split(' ')
            .map(|s| s.parse().unwrap())
            .collect(),
    )
}

pub fn conference_flags(desc: &SessionDescription) -> usize {
    desc.sdp
        .lines()
        .filter(|l| *l == "a=x-google-flag:conference")
        .count()
}

pub fn ssrcs(values: &[u32]) -> Vec<Ssrc> {
    values.iter().copied().map(Ssrc::from).collect()
}
