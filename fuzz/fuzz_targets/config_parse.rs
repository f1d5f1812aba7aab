#![no_main]

use std::path::Path;

use hangar_config::parse_config;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = parse_config(text) {
        let _ = config.jobs();
        let _ = config.api_endpoint();
        for name in config.publication_names() {
            let _ = config.resolve_publication(name, Path::new("/nonexistent"));
        }
    }
});
