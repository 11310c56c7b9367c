//! Watch example using the in-process remote.
//!
//! A background thread plays the remote config service and pushes a few
//! changes; the main thread consumes events from one outlet and re-reads the
//! cache. One outlet is never drained, to show dropped events in the logs.
//!
//! # Running
//!
//! ```bash
//! RUST_LOG=confwatch=debug cargo run --example watch_memory
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use confwatch::{ClientConfig, MemoryRemote, WatchClient};
use tracing_subscriber::EnvFilter;

const APP: &str = "billing";

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("confwatch=info")),
        )
        .with_thread_names(true)
        .init();

    let remote = Arc::new(MemoryRemote::new());
    remote.set(APP, "limits.json", r#"{"max_items": 20}"#);
    remote.set(APP, "feature.flag", "off");

    let config = ClientConfig::default()
        .with_app_id(APP)
        .with_namespace("demo")
        .with_servers("http://127.0.0.1:8848")?
        .with_log_dir(std::env::temp_dir().join("confwatch/log"))
        .with_cache_dir(std::env::temp_dir().join("confwatch/cache"))
        .with_event_buffer(2);

    let client = WatchClient::new(config, remote.clone())?;

    let events = client.watch(["limits.json", "feature.flag"]);
    let _ignored = client.watch(["feature.flag"]);

    println!("Initial snapshot:");
    for (key, value) in &client.get_all() {
        println!("  {key} = {value}");
    }
    println!();

    let producer = {
        let remote = remote.clone();
        thread::spawn(move || {
            for n in 1..=4 {
                thread::sleep(Duration::from_millis(100));
                remote.publish(APP, "limits.json", format!(r#"{{"max_items": {}}}"#, 20 + n * 10));
                remote.publish(APP, "feature.flag", if n % 2 == 0 { "off" } else { "on" });
            }
        })
    };

    for _ in 0..8 {
        let Ok(event) = events.recv_timeout(Duration::from_secs(2)) else {
            break;
        };

        match event.key.as_str() {
            "limits.json" => {
                let limits: serde_json::Value = event.value.json()?;
                println!("{} {} -> max_items = {}", event.kind, event.key, limits["max_items"]);
            }
            _ => println!("{} {} -> {}", event.kind, event.key, event.value.bool()?),
        }
    }

    let _ = producer.join();

    println!();
    println!("Cache epoch: {}", client.epoch());
    println!("Events dropped on the undrained outlet: {}", client.dropped_events());

    client.close()?;
    println!("Closed; registered keys left: {:?}", client.registered_keys());

    Ok(())
}
