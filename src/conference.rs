use crate::sdp::{MediaAttribute, MediaLine};

/// Tells Chrome to send simulcast to us.
pub const CONFERENCE_FLAG: &str = "x-google-flag:conference";

/// Make `a=x-google-flag:conference` present exactly once when simulcast is
/// active, and absent otherwise.
pub fn annotate(media: MediaLine, simulcast_active: bool) -> MediaLine {
    let MediaLine {
        typ,
        desc,
        mut attrs,
    } = media;

    let is_flag = |a: &MediaAttribute| matches!(a, MediaAttribute::Unused(v) if v == CONFERENCE_FLAG);

    if simulcast_active {
        let mut found = false;
        attrs.retain(|a| {
            if !is_flag(a) {
                return true;
            }
            let keep = !found;
            found = true;
            keep
        });
        if !found {
            attrs.push(MediaAttribute::Unused(CONFERENCE_FLAG.into()));
        }
    } else {
        attrs.retain(|a| !is_flag(a));
    }

    MediaLine { typ, desc, attrs }
}
