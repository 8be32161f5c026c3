#![no_main]

use bitforge::Settings;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Must not panic on arbitrary input
        if let Ok(settings) = Settings::from_json(s) {
            // Accepted documents are valid and survive a round trip
            assert!(settings.validate().is_ok());
            let json = settings.to_json().unwrap();
            assert_eq!(Settings::from_json(&json).unwrap(), settings);
        }
    }
});
