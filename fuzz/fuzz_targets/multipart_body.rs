#![no_main]

use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;

use formguard::canon::normalize_multipart_body;
use formguard::mime::MimeRegistry;

fn registry() -> &'static MimeRegistry {
    static REGISTRY: OnceLock<MimeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(MimeRegistry::builtin)
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte splits the payload into boundary and body.
    let payload = &data[1..];
    let split = (data[0] as usize) % (payload.len() + 1);
    let (boundary, body) = payload.split_at(split);

    let Ok(canonical) = normalize_multipart_body(boundary, body, registry()) else {
        return;
    };

    // Whatever was accepted must serialize to a form the parser accepts
    // again; a canonical body the proxy itself would reject is a bug.
    normalize_multipart_body(boundary, &canonical, registry())
        .expect("canonical multipart body must renormalize");
});
