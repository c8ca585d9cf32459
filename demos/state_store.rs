use statecache::{json, MemoryStorage, SetOptions, StateConfig, StateManager};
use std::sync::Arc;

/// Example of the state manager: nested paths, listeners, batches, computed
/// values, persistence and undo/redo.
///
/// Run with `RUST_LOG=statecache_core=debug` to see history moves.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statecache_core=info".into()),
        )
        .init();

    println!("=== State Manager Example ===\n");

    let storage = Arc::new(MemoryStorage::new());
    let state = StateManager::with_config(
        StateConfig::default()
            .app_prefix("admin")
            .storage(storage.clone()),
    );

    let _ = state.on("app.config.theme", |new, old, path| {
        println!("  {} changed: {:?} -> {:?}", path, old, new);
    });

    println!("--- Nested writes ---");
    state.set("app", json!({"config": {"theme": "light", "lang": "en"}}));
    state.set("app.config.lang", "fr");
    state.set("app.config.theme", "dark");

    println!("\n--- Batch ---");
    state.batch(|| {
        state.set("app.config.theme", "blue");
        state.set("app.config.theme", "green");
    });

    println!("\n--- Computed ---");
    state.set("cart.price", 25);
    state.set("cart.quantity", 2);
    state.computed("cart.total", &["cart.price", "cart.quantity"], |deps| {
        let price = deps[0].as_ref().and_then(|v| v.as_i64()).unwrap_or(0);
        let quantity = deps[1].as_ref().and_then(|v| v.as_i64()).unwrap_or(0);
        json!(price * quantity)
    });
    println!("Total: {:?}", state.get("cart.total"));
    state.set("cart.quantity", 4);
    println!("Total after quantity = 4: {:?}", state.get("cart.total"));

    println!("\n--- Persistence ---");
    state.set_with("prefs.density", "compact", SetOptions::persist());
    let fresh = StateManager::with_config(
        StateConfig::default()
            .app_prefix("admin")
            .storage(storage),
    );
    fresh.load_from_storage("prefs.density");
    println!("Reloaded prefs.density: {:?}", fresh.get("prefs.density"));

    println!("\n--- Undo / redo ---");
    state.enable_history();
    for n in 1..=3 {
        state.set("counter", n);
    }
    state.undo();
    println!("After undo: {:?}", state.get("counter"));
    state.redo();
    println!("After redo: {:?}", state.get("counter"));
    println!("Snapshots recorded: {}", state.get_history().len());
}
