#![no_main]

use confwatch::{ServerAddr, parse_servers};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let Ok(servers) = parse_servers(data) else {
        return;
    };

    assert!(!servers.is_empty());

    for server in servers {
        assert!(!server.host.is_empty());
        assert!(server.context_path.is_empty() || server.context_path.starts_with('/'));

        // A parsed address renders to a URL that parses back to the same address.
        let rendered = server.to_string();
        if let Ok(again) = ServerAddr::parse(&rendered) {
            assert_eq!(again.host, server.host);
            assert_eq!(again.port, server.port);
        }
    }
});
