//! Fuzz target for instrument and date parsing.
//!
//! Both parsers must never panic, and a parsed date must either be the
//! invalid marker or a real calendar date.

#![no_main]

use libfuzzer_sys::fuzz_target;
use xbt::{parse_instrument, parse_observation_date};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let (model, manufacturer) = parse_instrument(text);
        assert!(!model.starts_with(' ') && !model.ends_with(' '));
        assert!(!manufacturer.starts_with(' ') && !manufacturer.ends_with(' '));

        let (year, month, day) = parse_observation_date(text);
        if year == 0 {
            assert_eq!((month, day), (0, 0));
        } else {
            assert!((1..=12).contains(&month));
            assert!((1..=31).contains(&day));
        }
    }
});
