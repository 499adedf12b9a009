//! Shared test setup: logging once per test binary, plus tree fixtures

use std::env;
use std::sync::Once;
use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{
    normalize, DataIndicator, IndicatorTree, LeafDefaults, SequentialIdGenerator,
    SupportingMaterial,
};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "debug");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    // Create a filter for noisy modules
    let noisy_modules = ["generational_arena"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::ENTER)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Normalize a JSON fixture with sequential ids and default leaf settings.
///
/// Panics on invalid fixtures; test use only.
pub fn tree_from_json(raw: serde_json::Value) -> IndicatorTree {
    normalize(&raw, &mut SequentialIdGenerator::new(), &LeafDefaults::default())
        .unwrap_or_else(|e| panic!("invalid fixture: {}", e))
}

/// Two roots, the first with two level-2 children and one level-3 grandchild:
///
/// ```text
/// 1   Teaching            (t)
/// 1.1   Staff             (t1)   leaf, one data indicator, one material
/// 1.2   Courses           (t2)
/// 1.2.1   Syllabus        (t21)  leaf
/// 2   Research            (r)    leaf
/// ```
pub fn sample_tree() -> IndicatorTree {
    tree_from_json(serde_json::json!([
        {
            "id": "t", "name": "Teaching", "children": [
                {
                    "id": "t1", "name": "Staff", "weight": 40,
                    "dataIndicators": [{ "id": "d1", "name": "Ratio", "threshold": ">= 4.2" }],
                    "supportingMaterials": [{ "id": "m1", "name": "Roster" }]
                },
                {
                    "id": "t2", "name": "Courses", "children": [
                        { "id": "t21", "name": "Syllabus" }
                    ]
                }
            ]
        },
        { "id": "r", "name": "Research" }
    ]))
}

pub fn data_indicator(name: &str, threshold: &str) -> DataIndicator {
    DataIndicator {
        threshold: threshold.to_string(),
        ..DataIndicator::named(name)
    }
}

pub fn material(name: &str) -> SupportingMaterial {
    SupportingMaterial::named(name)
}
