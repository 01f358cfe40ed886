#![no_main]

use chrono::{DateTime, Utc};
use libfuzzer_sys::fuzz_target;
use xp_profiler::capture::classify;
use xp_profiler::har::HarEntry;
use xp_profiler::replay::end_time;

fuzz_target!(|data: &[u8]| {
    // First line is a HAR entry, the rest is the response body
    if let Ok(input) = std::str::from_utf8(data) {
        let (entry, body) = input.split_once('\n').unwrap_or((input, ""));
        if let Ok(entry) = serde_json::from_str::<HarEntry>(entry) {
            // Must never panic, whatever the entry or body looks like
            let _ = classify(&entry, Some(body), DateTime::<Utc>::MAX_UTC);
            let _ = classify(&entry, Some(body), end_time(&entry));
        }
    }
});
