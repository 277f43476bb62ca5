#![no_main]

use libfuzzer_sys::fuzz_target;
use simulcast_sdp::{SessionDescription, Simulcast};

fuzz_target!(|data: &[u8]| {
    let Ok(sdp) = std::str::from_utf8(data) else {
        return;
    };

    let mut simulcast = Simulcast::new();
    let offer = SessionDescription::offer(sdp);

    // Twice, to go through the restore path.
    let first = simulcast.munge_local_description(offer.clone());
    simulcast.munge_local_description(offer);
    simulcast.munge_local_description(first);
});
