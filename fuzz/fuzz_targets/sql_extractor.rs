//! Fuzz target for the SQL extractor.
//!
//! Feeds arbitrary text to the extractor and, when extraction succeeds,
//! through the text-mode differ and the generator.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_sql_extractor
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use pgdelta_migrate::{MigrationGenerator, SchemaDiffer};
use pgdelta_schema::extract;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Errors are fine, panics are not
        if extract(input).is_ok() {
            if let Ok(changes) = SchemaDiffer::default().diff_sdl("", input) {
                let _ = MigrationGenerator::default().generate(&changes);
            }
        }
    }
});
