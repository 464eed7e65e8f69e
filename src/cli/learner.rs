//! Shared plumbing between the learner record and the engine.
//!
//! Every command loads the record (or starts a fresh one), builds an engine
//! over it, and writes the engine's state back after a successful intent.

use crate::config::Config;
use crate::core::{Catalog, Engine, EngineSettings};
use crate::error::Result;
use crate::storage::{LearnerRecord, LearnerStore};

/// Load the learner's record, or a fresh one seeded from the catalog.
pub(crate) fn load_record<S: LearnerStore>(store: &S, catalog: &Catalog) -> Result<LearnerRecord> {
    Ok(store.load()?.unwrap_or_else(|| LearnerRecord::new(catalog)))
}

/// Build an engine over the record's state.
pub(crate) fn open_engine(catalog: &Catalog, config: &Config, record: &LearnerRecord) -> Engine {
    Engine::with_state(catalog.clone(), record.engine_state())
        .with_settings(EngineSettings::from(config))
}

/// Write the engine's state back into the record and persist it.
pub(crate) fn persist<S: LearnerStore>(
    store: &S,
    record: &mut LearnerRecord,
    engine: &Engine,
) -> Result<()> {
    record.absorb(engine.state());
    store.save(record)
}
