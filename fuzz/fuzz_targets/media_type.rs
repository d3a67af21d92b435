#![no_main]

use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;

use formguard::canon::parse_media_type;
use formguard::mime::MimeRegistry;

fn registry() -> &'static MimeRegistry {
    static REGISTRY: OnceLock<MimeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(MimeRegistry::builtin)
}

fuzz_target!(|data: &[u8]| {
    let Ok(parsed) = parse_media_type(data, registry()) else {
        return;
    };

    // The serializer emits parameter values unquoted, so values that only
    // fit the quoted-string form need not reparse. When the canonical
    // form does reparse, it must be a fixed point.
    let canonical = parsed.serialize();
    if let Ok(reparsed) = parse_media_type(&canonical, registry()) {
        assert_eq!(reparsed.serialize(), canonical);
    }
});
