#![no_main]

use hangar_client::parse_error_message;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let body = String::from_utf8_lossy(data);
    let _ = parse_error_message(&body, "Bad Request");
});
