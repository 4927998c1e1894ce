use log::debug;

use crate::runtime::{
    error::RuntimeError,
    gc::{CollectStats, RootSet},
};

use super::Vm;

impl Vm {
    /// Gathers every value the running program can still reach.
    pub fn roots(&self) -> RootSet {
        let mut roots = RootSet::new();
        roots.add(&self.globals);
        for frame in &self.frames {
            roots.add(&frame.closure);
            roots.add(&frame.env);
            for handle in &frame.retained {
                roots.add(handle);
            }
        }
        roots.add_values(&self.stack);
        roots.add_values(self.tasks.roots());
        roots
    }

    /// Collects if either trigger has fired.
    ///
    /// A pass that finds a value exclusively held is skipped and retried at
    /// the next safepoint.
    pub fn safepoint(&mut self) -> Result<Option<CollectStats>, RuntimeError> {
        if !self.gc_heap.should_collect() {
            return Ok(None);
        }
        match self.force_collect() {
            Ok(stats) => Ok(Some(stats)),
            Err(RuntimeError::CollectorBusy { id }) => {
                debug!("safepoint collection deferred by {}", id);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Collects unless collection is disabled.
    pub fn collect(&mut self) -> Result<Option<CollectStats>, RuntimeError> {
        if !self.gc_heap.config().enabled {
            return Ok(None);
        }
        self.force_collect().map(Some)
    }

    /// Runs a full pass regardless of triggers or the enabled flag.
    pub fn force_collect(&mut self) -> Result<CollectStats, RuntimeError> {
        let roots = self.roots();
        self.gc_heap.collect(&roots)
    }
}
