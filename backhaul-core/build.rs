//! Build script for backhaul-core
//!
//! Validates feature flag combinations so impossible configurations fail
//! at build time instead of deep inside a cfg maze.

use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_STD");

    let std_enabled = env::var("CARGO_FEATURE_STD").is_ok();
    let tracing_enabled = env::var("CARGO_FEATURE_TRACING").is_ok();
    let defmt_enabled = env::var("CARGO_FEATURE_DEFMT").is_ok();

    if tracing_enabled && !std_enabled {
        panic!(
            r#"
Invalid feature combination: 'tracing' requires 'std'

   Use:
   - std + tracing   -> edge/host targets
   - defmt           -> embedded no_std targets
"#
        );
    }

    if defmt_enabled && std_enabled {
        panic!(
            r#"
Invalid feature combination: cannot enable both 'defmt' and 'std'

   'defmt' targets embedded no_std builds; std targets log through 'tracing'.

   Use:
   - std + tracing   -> edge/host targets
   - defmt           -> embedded no_std targets
"#
        );
    }
}
