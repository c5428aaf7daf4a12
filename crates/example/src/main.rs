//! Plays a short scripted session of the lantern adventure.
//!
//! # Usage
//!
//! ```bash
//! lantern
//! RUST_LOG=quill=debug lantern
//! ```

use example::{LanternGame, SCRIPT, perform, world};
use quill_core_modules::{CoreTurnModule, DefaultModules, TracingFormat, TracingModule};
use quill_modules::{BehaviorCatalog, ModuleGroup};

fn main() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_owned());

    let mut catalog = BehaviorCatalog::new();
    catalog
        .add_modules(
            DefaultModules
                .build()
                .disable::<TracingModule>()
                .add_before::<_, CoreTurnModule>(
                    TracingModule::default()
                        .with_format(TracingFormat::Compact)
                        .with_env_filter(filter),
                ),
        )
        .add_modules(LanternGame.build());

    let engine = match catalog.finalize_loading() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let mut state = match world() {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    for command in SCRIPT {
        println!("> {command}");
        for line in perform(&engine, &mut state, command) {
            println!("{line}");
        }
        println!();
    }
    println!("[{} turns]", state.turn);
}
