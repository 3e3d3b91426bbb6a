use super::container::{Transformed, assemble};
use super::control::{CancelToken, Gate};
use super::error::Error;
use super::input::Input;
use super::progress::{ProgressSink, Tracker, TracingProgress};
use super::rank::promote;
use crate::model::collection::Entry;
use crate::model::slot::Slot;
use crate::model::structure::Structure;
use crate::ops::{Output, TransformUnit};
use crate::utils::parallel::{self, *};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs transform units over single structures or whole collections.
///
/// The engine owns everything a unit should not care about: choosing the container shape,
/// preserving order and labels, isolating per-item failures, spreading work over a worker
/// pool, gating collaborator access, reporting progress, and honoring cancellation.
#[derive(Clone, Default)]
pub struct Engine {
    progress: Option<Arc<dyn ProgressSink>>,
    cancel: CancelToken,
}

/// Everything a worker needs to process one item.
struct Batch<'a> {
    unit: &'a dyn TransformUnit,
    name: &'a str,
    gate: Gate,
    tracker: Tracker,
    cancel: &'a CancelToken,
    total: usize,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink used for verbose units; defaults to [`TracingProgress`].
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels runs of this engine; clone it into another thread to stop a batch.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Applies `unit` to every item of `input`.
    ///
    /// The result has one position per input item, in input order, with labels copied from
    /// the collection. Items the unit fails on, and items that were already absent, come back
    /// as absent slots; the rest of the batch is unaffected. The unit's configuration is read
    /// once, here, and holds for the whole run.
    ///
    /// # Errors
    ///
    /// - [`Error::CollaboratorUnavailable`] when a collaborator cannot be reached, either at
    ///   startup or during the run.
    /// - [`Error::InvalidConfiguration`] when the unit's options are unusable.
    /// - [`Error::ContractViolation`] when an output does not match the declared kind.
    /// - [`Error::Cancelled`] when the cancel token fires before every item has started.
    /// - [`Error::WorkerPool`] when the worker pool cannot be created.
    pub fn transform<'a>(
        &self,
        input: impl Into<Input<'a>>,
        unit: &dyn TransformUnit,
    ) -> Result<Transformed, Error> {
        let input = input.into();
        let config = unit.config().clone();
        let name = unit.name();

        if let Err(err) = unit.check_ready() {
            let reason = err.to_string();
            let fatal = Error::from_fatal(name, err).unwrap_or_else(|| {
                Error::CollaboratorUnavailable {
                    collaborator: name.to_string(),
                    details: reason,
                }
            });
            warn!(unit = name, error = %fatal, "unit is not ready");
            return Err(fatal);
        }

        let kind = unit.output_kind();
        let shape = promote(kind.rank(), input.cardinality());
        let total = input.len();
        let workers = config.worker_count().min(total.max(1));
        let sink = config.verbose.then(|| {
            self.progress
                .clone()
                .unwrap_or_else(|| Arc::new(TracingProgress::new()) as Arc<dyn ProgressSink>)
        });
        let access = unit.effective_access();

        debug!(
            unit = name,
            items = total,
            workers,
            shape = %shape,
            access = ?access,
            "starting batch"
        );

        let batch = Batch {
            unit,
            name,
            gate: Gate::new(access),
            tracker: Tracker::new(sink, total),
            cancel: &self.cancel,
            total,
        };

        let (labels, outcome) = match input {
            Input::Single(structure) => {
                let outcome = batch.run(Slot::Filled(structure), "-").map(|s| vec![s]);
                (Vec::new(), outcome)
            }
            Input::Item(slot) => {
                let outcome = batch.run(slot.as_mut(), "-").map(|s| vec![s]);
                (Vec::new(), outcome)
            }
            Input::Collection(collection) => {
                let labels = collection.labels();
                let entries = collection.entries_mut();
                let outcome = parallel::with_workers(workers, || {
                    entries
                        .par_iter_mut()
                        .map(|entry| {
                            let Entry { label, structure } = entry;
                            batch.run(structure.as_mut(), label.as_str())
                        })
                        .collect::<Result<Vec<_>, Error>>()
                })
                .map_err(Error::from)
                .and_then(|outcome| outcome);
                (labels, outcome)
            }
        };

        let slots = match outcome {
            Ok(slots) => slots,
            Err(err) => {
                batch.tracker.abandon();
                warn!(
                    unit = name,
                    processed = batch.tracker.processed(),
                    total,
                    error = %err,
                    "batch stopped early"
                );
                return Err(err);
            }
        };
        batch.tracker.finish();

        let result = assemble(name, shape, &kind, unit.feature_names(), labels, slots)?;
        info!(
            unit = name,
            items = total,
            absent = result.absent_count(),
            elapsed_ms = batch.tracker.elapsed().as_millis() as u64,
            "batch complete"
        );
        Ok(result)
    }
}

impl Batch<'_> {
    fn run(&self, item: Slot<&mut Structure>, label: &str) -> Result<Slot<Output>, Error> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled {
                processed: self.tracker.processed(),
                total: self.total,
            });
        }

        let slot = match item {
            Slot::Filled(structure) => {
                let result = {
                    let _permit = self.gate.acquire();
                    self.unit.apply(structure)
                };
                match result {
                    Ok(output) => Slot::Filled(output),
                    Err(err) => {
                        let reason = err.to_string();
                        if let Some(fatal) = Error::from_fatal(self.name, err) {
                            return Err(fatal);
                        }
                        debug!(unit = self.name, label, reason = %reason, "item absent");
                        Slot::absent(reason)
                    }
                }
            }
            Slot::Absent(absence) => {
                debug!(unit = self.name, label, reason = %absence.reason, "input item already absent");
                Slot::Absent(absence)
            }
        };

        self.tracker.advance();
        Ok(slot)
    }
}

/// Runs `unit` over `input` with a default [`Engine`].
pub fn transform<'a>(
    input: impl Into<Input<'a>>,
    unit: &dyn TransformUnit,
) -> Result<Transformed, Error> {
    Engine::new().transform(input, unit)
}
