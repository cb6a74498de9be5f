//! Rewrite orchestration.
//!
//! [`Rewriter`] is the single entry point the host loader talks to. Each call walks
//! `Received -> Classified -> {Declined | Injecting -> Wrapping -> Serialized}` on a class
//! model it owns exclusively, so a failure at any stage simply drops the model and the host
//! keeps the original bytes. Nothing but a [`RewriteOutcome`] leaves the rewriter: errors are
//! folded into [`DeclineReason::Failed`] and panics are caught at the boundary.
//!
//! The rewriter is `Send + Sync`. Its only shared mutable state is the [`UnitPool`] and the
//! atomic [`RewriteStats`], so any number of loader threads may call it concurrently.

use std::{
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use rayon::prelude::*;

use crate::{
    engine::{
        config::EngineConfig,
        hook::{ensure_hook_field, HookInjection},
        pool::UnitPool,
        scope::{classify, normalize_unit_name, OutOfScope, ScopeDecision, ScopedUnit, UnitResolver},
        wrapper::wrap_methods,
        FacadeBinding,
    },
    Error, Result,
};

/// Why a unit was left unchanged.
#[derive(Debug)]
pub enum DeclineReason {
    /// The classifier rejected the unit.
    OutOfScope(OutOfScope),
    /// The unit was already emitted, is being rewritten elsewhere, or is already defined.
    Finalized,
    /// A stage failed; the error has been logged.
    Failed(Error),
}

impl fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclineReason::OutOfScope(kind) => write!(f, "out of scope ({kind})"),
            DeclineReason::Finalized => f.write_str("already finalized"),
            DeclineReason::Failed(error) => write!(f, "failed: {error}"),
        }
    }
}

/// Result of one rewrite call.
#[derive(Debug)]
pub enum RewriteOutcome {
    /// The unit was rewritten; these bytes replace the original.
    Transformed(Vec<u8>),
    /// The unit is left as it is.
    Declined(DeclineReason),
}

impl RewriteOutcome {
    /// Returns true for [`RewriteOutcome::Transformed`].
    #[must_use]
    pub fn is_transformed(&self) -> bool {
        matches!(self, RewriteOutcome::Transformed(_))
    }

    /// The decline reason, if any.
    #[must_use]
    pub fn decline_reason(&self) -> Option<&DeclineReason> {
        match self {
            RewriteOutcome::Transformed(_) => None,
            RewriteOutcome::Declined(reason) => Some(reason),
        }
    }

    /// Host view of the outcome: replacement bytes, or `None` to keep the original.
    #[must_use]
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            RewriteOutcome::Transformed(bytes) => Some(bytes),
            RewriteOutcome::Declined(_) => None,
        }
    }
}

/// Outcome counters, updated atomically by every rewrite call.
#[derive(Debug, Default)]
pub struct RewriteStats {
    transformed: AtomicUsize,
    out_of_scope: AtomicUsize,
    finalized: AtomicUsize,
    failed: AtomicUsize,
}

/// Point-in-time copy of [`RewriteStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Units rewritten
    pub transformed: usize,
    /// Units declined by the classifier
    pub out_of_scope: usize,
    /// Units declined as finalized
    pub finalized: usize,
    /// Units declined after a failure
    pub failed: usize,
}

impl StatsSnapshot {
    /// Total number of rewrite calls.
    #[must_use]
    pub fn total(&self) -> usize {
        self.transformed + self.out_of_scope + self.finalized + self.failed
    }
}

impl RewriteStats {
    fn record(&self, outcome: &RewriteOutcome) {
        let counter = match outcome {
            RewriteOutcome::Transformed(_) => &self.transformed,
            RewriteOutcome::Declined(DeclineReason::OutOfScope(_)) => &self.out_of_scope,
            RewriteOutcome::Declined(DeclineReason::Finalized) => &self.finalized,
            RewriteOutcome::Declined(DeclineReason::Failed(_)) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            transformed: self.transformed.load(Ordering::Relaxed),
            out_of_scope: self.out_of_scope.load(Ordering::Relaxed),
            finalized: self.finalized.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// The host's current definition of a unit that is being loaded again (retransformation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingDefinition {
    /// Binary name of the defined unit
    pub name: String,
}

/// Host security context of the loading unit. Carried for the host's benefit, not inspected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProtectionDomain {
    /// Location the unit was loaded from, if known
    pub code_source: Option<String>,
}

/// Everything the host passes for one load.
pub struct LoadRequest<'a> {
    /// The defining loader's view, used to probe for companion units
    pub loader: &'a dyn UnitResolver,
    /// Unit name in internal or binary form
    pub unit_name: &'a str,
    /// Present when the unit is already defined
    pub existing_definition: Option<&'a ExistingDefinition>,
    /// Host security context
    pub protection_domain: Option<&'a ProtectionDomain>,
    /// The unit's bytes
    pub bytes: &'a [u8],
}

impl<'a> LoadRequest<'a> {
    /// A first-time load without protection domain.
    #[must_use]
    pub fn new(loader: &'a dyn UnitResolver, unit_name: &'a str, bytes: &'a [u8]) -> Self {
        LoadRequest {
            loader,
            unit_name,
            existing_definition: None,
            protection_domain: None,
            bytes,
        }
    }

    /// Sets the existing definition.
    #[must_use]
    pub fn with_existing_definition(mut self, definition: &'a ExistingDefinition) -> Self {
        self.existing_definition = Some(definition);
        self
    }

    /// Sets the protection domain.
    #[must_use]
    pub fn with_protection_domain(mut self, domain: &'a ProtectionDomain) -> Self {
        self.protection_domain = Some(domain);
        self
    }
}

/// A load-time transformer registered with the host.
pub trait ClassFileTransformer: Send + Sync {
    /// Returns replacement bytes, or `None` to keep the original.
    fn transform(&self, request: &LoadRequest<'_>) -> Option<Vec<u8>>;
}

/// The rewrite engine.
#[derive(Debug)]
pub struct Rewriter {
    config: EngineConfig,
    binding: FacadeBinding,
    pool: Arc<UnitPool>,
    stats: RewriteStats,
}

impl Default for Rewriter {
    fn default() -> Self {
        Rewriter::new(EngineConfig::default(), FacadeBinding::default())
    }
}

impl Rewriter {
    /// Creates a rewriter with its own unit pool.
    #[must_use]
    pub fn new(config: EngineConfig, binding: FacadeBinding) -> Self {
        Rewriter::with_pool(config, binding, Arc::new(UnitPool::new()))
    }

    /// Creates a rewriter sharing an existing unit pool.
    #[must_use]
    pub fn with_pool(config: EngineConfig, binding: FacadeBinding, pool: Arc<UnitPool>) -> Self {
        Rewriter {
            config,
            binding,
            pool,
            stats: RewriteStats::default(),
        }
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The facade binding used for generated code.
    #[must_use]
    pub fn binding(&self) -> &FacadeBinding {
        &self.binding
    }

    /// The unit pool.
    #[must_use]
    pub fn pool(&self) -> &Arc<UnitPool> {
        &self.pool
    }

    /// Outcome counters.
    #[must_use]
    pub fn stats(&self) -> &RewriteStats {
        &self.stats
    }

    /// Host entry point: replacement bytes, or `None` to keep the original.
    pub fn on_load(&self, request: &LoadRequest<'_>) -> Option<Vec<u8>> {
        self.rewrite_request(request).into_bytes()
    }

    /// Rewrite a first-time load.
    pub fn rewrite(&self, bytes: &[u8], unit_name: &str, resolver: &dyn UnitResolver) -> RewriteOutcome {
        self.rewrite_request(&LoadRequest::new(resolver, unit_name, bytes))
    }

    /// Rewrite many units in parallel. Outcomes are returned in input order.
    pub fn rewrite_batch(
        &self,
        units: &[(&str, &[u8])],
        resolver: &dyn UnitResolver,
    ) -> Vec<RewriteOutcome> {
        units
            .par_iter()
            .map(|(name, bytes)| self.rewrite(bytes, name, resolver))
            .collect()
    }

    /// Rewrite one load request. Never fails and never panics.
    pub fn rewrite_request(&self, request: &LoadRequest<'_>) -> RewriteOutcome {
        let name = normalize_unit_name(request.unit_name);
        let outcome = catch_unwind(AssertUnwindSafe(|| self.run(request, &name)))
            .unwrap_or_else(|panic| {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                RewriteOutcome::Declined(DeclineReason::Failed(Error::Internal(message)))
            });

        match &outcome {
            RewriteOutcome::Transformed(bytes) => {
                log::info!("Instrumented {name} ({} bytes)", bytes.len());
            }
            RewriteOutcome::Declined(DeclineReason::Failed(error)) => {
                log::warn!("Skipping instrumentation of {name}: {error}");
            }
            RewriteOutcome::Declined(reason) => {
                log::debug!("{name}: {reason}");
            }
        }
        self.stats.record(&outcome);
        outcome
    }

    fn run(&self, request: &LoadRequest<'_>, name: &str) -> RewriteOutcome {
        let mut unit = match classify(request.bytes, name, request.loader) {
            ScopeDecision::InScope(unit) => unit,
            ScopeDecision::OutOfScope(kind) => {
                return RewriteOutcome::Declined(DeclineReason::OutOfScope(kind))
            }
        };

        if request.existing_definition.is_some() {
            self.pool.mark_finalized(name);
            return RewriteOutcome::Declined(DeclineReason::Finalized);
        }
        let Some(lease) = self.pool.try_lease(name) else {
            return RewriteOutcome::Declined(DeclineReason::Finalized);
        };

        match self.instrument(&mut unit) {
            Ok(Some(bytes)) => {
                lease.commit();
                RewriteOutcome::Transformed(bytes)
            }
            Ok(None) => {
                lease.commit();
                RewriteOutcome::Declined(DeclineReason::Finalized)
            }
            Err(error) => RewriteOutcome::Declined(DeclineReason::Failed(error)),
        }
    }

    /// Inject, wrap and serialize. `None` means the unit already carried all instrumentation.
    fn instrument(&self, unit: &mut ScopedUnit) -> Result<Option<Vec<u8>>> {
        let injection = ensure_hook_field(&mut unit.class, &self.binding)?;
        let wrapped = wrap_methods(unit, &self.binding, self.config.verbose)?;
        if injection == HookInjection::AlreadyPresent && wrapped == 0 {
            return Ok(None);
        }
        log::debug!("{}: hook {injection}, {wrapped} methods wrapped", unit.name);
        unit.class.to_bytes().map(Some)
    }
}

impl ClassFileTransformer for Rewriter {
    fn transform(&self, request: &LoadRequest<'_>) -> Option<Vec<u8>> {
        self.on_load(request)
    }
}
