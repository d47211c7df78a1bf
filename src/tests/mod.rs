//! Crate-level behavior tests, grouped by concern. Unit tests live next to
//! the code they cover; everything here exercises the public surface.

mod canonical_tests;

use std::sync::Once;

static INIT: Once = Once::new();

/// Route `log` output to stderr once so failing tests show engine traces.
pub(crate) fn init_logging() {
    INIT.call_once(|| {
        let _ = simplelog::SimpleLogger::init(
            simplelog::LevelFilter::Debug,
            simplelog::Config::default(),
        );
    });
}
