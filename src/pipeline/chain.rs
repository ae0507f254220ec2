//! Ordered execution of one filter phase.
//!
//! # Responsibilities
//! - Order filters by their declared order value, deterministically
//! - Evaluate applicability, run transforms, track outcomes per filter
//! - Abort the phase on the first unrecoverable filter fault
//!
//! # Design Decisions
//! - Stable sort: equal order values run in registration order
//! - A failed phase records the error in the context instead of
//!   propagating it; the caller decides what runs next (the outbound
//!   phase always runs, so diagnostics attach to error responses)

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::pipeline::context::{FilterExecution, FilterStatus, GatewayError, SessionContext};
use crate::pipeline::filter::{Filter, Phase};

/// Result of running one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    Completed,
    Failed,
}

impl PhaseOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, PhaseOutcome::Failed)
    }
}

/// An ordered chain of filters for a single phase.
pub struct FilterChain<M> {
    phase: Phase,
    filters: Vec<Arc<dyn Filter<M>>>,
}

impl<M> FilterChain<M> {
    /// Build a chain. Filters are sorted ascending by `order()`; the sort
    /// is stable, so order collisions resolve by registration order.
    pub fn new(phase: Phase, mut filters: Vec<Arc<dyn Filter<M>>>) -> Self {
        filters.sort_by_key(|f| f.order());
        Self { phase, filters }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run the phase over `message`.
    ///
    /// Each applicable filter transforms the working message in place. A
    /// filter error records `GatewayError::Filter` in the context, marks
    /// the entry FAILED, and aborts the remaining filters of this phase.
    pub fn run(&self, message: &mut M, ctx: &mut SessionContext) -> PhaseOutcome {
        for filter in &self.filters {
            if !filter.should_apply(message) {
                ctx.record_filter(FilterExecution {
                    name: filter.name(),
                    status: FilterStatus::Skipped,
                    duration: Duration::ZERO,
                });
                continue;
            }

            let started = Instant::now();
            match filter.apply(message, ctx) {
                Ok(()) => {
                    ctx.record_filter(FilterExecution {
                        name: filter.name(),
                        status: FilterStatus::Success,
                        duration: started.elapsed(),
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        filter = filter.name(),
                        phase = %self.phase,
                        error = %err,
                        "filter failed, aborting phase"
                    );
                    ctx.record_filter(FilterExecution {
                        name: filter.name(),
                        status: FilterStatus::Failed,
                        duration: started.elapsed(),
                    });
                    ctx.set_error(GatewayError::Filter {
                        name: filter.name(),
                        phase: self.phase,
                        reason: err.to_string(),
                    });
                    return PhaseOutcome::Failed;
                }
            }
        }
        PhaseOutcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::filter::FilterError;

    /// Test filter that appends its name to the passport on apply.
    struct Recording {
        name: &'static str,
        order: i32,
        applies: bool,
        fail: bool,
    }

    impl Recording {
        fn new(name: &'static str, order: i32) -> Arc<Self> {
            Arc::new(Self {
                name,
                order,
                applies: true,
                fail: false,
            })
        }

        fn skipped(name: &'static str, order: i32) -> Arc<Self> {
            Arc::new(Self {
                name,
                order,
                applies: false,
                fail: false,
            })
        }

        fn failing(name: &'static str, order: i32) -> Arc<Self> {
            Arc::new(Self {
                name,
                order,
                applies: true,
                fail: true,
            })
        }
    }

    impl Filter<Vec<&'static str>> for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn order(&self) -> i32 {
            self.order
        }

        fn should_apply(&self, _message: &Vec<&'static str>) -> bool {
            self.applies
        }

        fn apply(
            &self,
            message: &mut Vec<&'static str>,
            _ctx: &mut SessionContext,
        ) -> Result<(), FilterError> {
            if self.fail {
                return Err(FilterError::new("boom"));
            }
            message.push(self.name);
            Ok(())
        }
    }

    #[test]
    fn test_filters_run_in_ascending_order() {
        let chain = FilterChain::new(
            Phase::Inbound,
            vec![
                Recording::new("c", 30) as Arc<dyn Filter<_>>,
                Recording::new("a", 0),
                Recording::new("b", 10),
            ],
        );
        let mut trace = Vec::new();
        let outcome = chain.run(&mut trace, &mut SessionContext::new());

        assert_eq!(outcome, PhaseOutcome::Completed);
        assert_eq!(trace, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_order_collisions_resolve_by_registration_order() {
        let chain = FilterChain::new(
            Phase::Inbound,
            vec![
                Recording::new("first", 5) as Arc<dyn Filter<_>>,
                Recording::new("second", 5),
                Recording::new("third", 5),
            ],
        );
        let mut trace = Vec::new();
        chain.run(&mut trace, &mut SessionContext::new());

        assert_eq!(trace, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_inapplicable_filter_is_skipped_and_recorded() {
        let chain = FilterChain::new(
            Phase::Inbound,
            vec![
                Recording::skipped("skipped", 0) as Arc<dyn Filter<_>>,
                Recording::new("ran", 1),
            ],
        );
        let mut trace = Vec::new();
        let mut ctx = SessionContext::new();
        chain.run(&mut trace, &mut ctx);

        assert_eq!(trace, vec!["ran"]);
        let summary = ctx.filter_summary();
        assert_eq!(summary[0].status, FilterStatus::Skipped);
        assert_eq!(summary[1].status, FilterStatus::Success);
    }

    #[test]
    fn test_filter_error_aborts_remaining_phase() {
        let chain = FilterChain::new(
            Phase::Outbound,
            vec![
                Recording::new("ok", 0) as Arc<dyn Filter<_>>,
                Recording::failing("bad", 1),
                Recording::new("never", 2),
            ],
        );
        let mut trace = Vec::new();
        let mut ctx = SessionContext::new();
        let outcome = chain.run(&mut trace, &mut ctx);

        assert_eq!(outcome, PhaseOutcome::Failed);
        assert_eq!(trace, vec!["ok"]);
        let error = ctx.error().expect("error recorded");
        assert!(error.to_string().contains("bad"));
        assert!(error.to_string().contains("outbound"));
    }
}
