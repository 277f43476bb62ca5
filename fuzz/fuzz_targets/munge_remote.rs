#![no_main]

use libfuzzer_sys::fuzz_target;
use simulcast_sdp::{SessionDescription, SimulcastConfig};

fuzz_target!(|data: &[u8]| {
    let Some((explode, rest)) = data.split_first() else {
        return;
    };
    let Ok(sdp) = std::str::from_utf8(rest) else {
        return;
    };

    let simulcast = SimulcastConfig::new()
        .set_explode_remote_simulcast(explode & 1 == 1)
        .build();

    let once = simulcast.munge_remote_description(SessionDescription::answer(sdp));
    let twice = simulcast.munge_remote_description(once.clone());

    assert_eq!(once, twice, "remote munging must be idempotent");
});
