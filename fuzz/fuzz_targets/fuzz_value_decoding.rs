#![no_main]

use confwatch::Value;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let value = Value::new(data);

    // === Scalar accessors - should never panic ===
    let _ = value.as_str();
    let _ = value.bool();
    let _ = value.int::<i8>();
    let _ = value.int::<u16>();
    let _ = value.int::<i64>();
    let _ = value.int::<usize>();
    let _ = value.float();
    let _ = value.parse::<std::net::IpAddr>();

    // === Structured decoders - should never panic ===
    let _ = value.json::<serde_json::Value>();
    let _ = value.toml::<confwatch::toml::Table>();
    let _ = value.yaml::<serde_json::Value>();

    // === Display matches the raw content ===
    assert_eq!(value.to_string(), data);
});
