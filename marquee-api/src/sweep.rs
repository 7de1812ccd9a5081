use std::convert::Infallible;

use tracing::info;

use marquee::scheduler::TickJob;

use crate::store::CatalogStore;

/// Periodic catalog sweep.
///
/// One pass per scheduler tick: walks the catalog and reports its size. The pass
/// holds the store lock only long enough to count, so it never delays a request
/// for longer than a lookup would.
pub struct CatalogSweep {
    store: CatalogStore,
}

impl CatalogSweep {
    /// Creates a sweep over the given catalog.
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }
}

impl TickJob for CatalogSweep {
    type Error = Infallible;

    fn name(&self) -> &'static str {
        "catalog_sweep"
    }

    async fn run(&mut self) -> Result<(), Self::Error> {
        let titles = self.store.len().await;
        info!(titles, "catalog sweep pass completed");

        Ok(())
    }
}
