//! Declarative flow registry: the single source of truth for stage wiring.
//!
//! Each `(flow, stage)` pair maps to a [`StageSpec`] with two optional
//! capabilities: an entry effect launched when the stage becomes active, and
//! an auto-advance predicate evaluated right after. A missing spec or a spec
//! with neither capability is valid and means "no automated behavior, await
//! an external event". The reducer asks the registry for the next stage on
//! every successful outcome; stage order is never hardcoded anywhere else.

use crate::event::{Dispatcher, Event};
use crate::services::Services;
use crate::state::{CoreContext, FlowContext, Step};
use crate::domain::FlowName;
use crate::error::FlowError;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a stage entry effect receives when invoked.
///
/// `flow` and `core` are clones of the snapshot the stage was entered with;
/// effects communicate results exclusively through `dispatcher` and must
/// check `cancel` before dispatching anything.
#[derive(Clone)]
pub struct EffectContext {
    /// Flow context at stage entry.
    pub flow: FlowContext,
    /// Environment facts at stage entry.
    pub core: CoreContext,
    /// Collaborator services.
    pub services: Arc<Services>,
    /// Feedback channel into the store.
    pub dispatcher: Dispatcher,
    /// Cancellation signal for this stage instance.
    pub cancel: CancellationToken,
}

impl EffectContext {
    /// Whether this stage instance has been superseded.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Dispatch unless this stage instance has been superseded.
    pub fn dispatch_if_live(&self, event: Event) {
        if self.is_stale() {
            tracing::debug!(step = ?self.flow.step, "suppressing dispatch from cancelled effect");
            return;
        }
        self.dispatcher.dispatch(event);
    }
}

/// Future returned by a stage entry effect.
pub type StageFuture = Pin<Box<dyn Future<Output = Result<(), FlowError>> + Send>>;

/// Entry effect bound to a stage.
pub type StageEffectFn = Arc<dyn Fn(EffectContext) -> StageFuture + Send + Sync>;

/// Auto-advance predicate: may synthesize the event that advances the stage
/// without waiting for external work.
pub type AutoAdvanceFn = Arc<dyn Fn(&FlowContext, &CoreContext) -> Option<Event> + Send + Sync>;

/// Wrap a plain `async fn(EffectContext) -> Result<(), FlowError>` as a
/// registry entry effect.
pub fn entry_effect<F, Fut>(f: F) -> StageEffectFn
where
    F: Fn(EffectContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), FlowError>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// Declarative behavior of one `(flow, stage)` pair.
#[derive(Clone, Default)]
pub struct StageSpec {
    /// Stage entered on a successful outcome.
    pub next: Option<Step>,
    /// Stage entered on `FLOW.BACK`.
    pub back: Option<Step>,
    /// Effect launched when the stage becomes active.
    pub entry: Option<StageEffectFn>,
    /// Predicate that may advance the stage without external work.
    pub auto_advance: Option<AutoAdvanceFn>,
}

impl std::fmt::Debug for StageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageSpec")
            .field("next", &self.next)
            .field("back", &self.back)
            .field("entry", &self.entry.is_some())
            .field("auto_advance", &self.auto_advance.is_some())
            .finish()
    }
}

/// Static table mapping `(flow, stage)` to its declared behavior.
#[derive(Debug, Default)]
pub struct FlowRegistry {
    stages: HashMap<(FlowName, Step), StageSpec>,
}

impl FlowRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the spec for a `(flow, stage)` pair.
    pub fn insert(&mut self, name: FlowName, step: Step, spec: StageSpec) {
        self.stages.insert((name, step), spec);
    }

    /// Spec for a pair, if declared.
    #[must_use]
    pub fn get(&self, name: FlowName, step: Step) -> Option<&StageSpec> {
        self.stages.get(&(name, step))
    }

    /// Registry-declared successor of a stage.
    #[must_use]
    pub fn next(&self, name: FlowName, step: Step) -> Option<Step> {
        self.get(name, step).and_then(|s| s.next)
    }

    /// Registry-declared back edge of a stage.
    #[must_use]
    pub fn back(&self, name: FlowName, step: Step) -> Option<Step> {
        self.get(name, step).and_then(|s| s.back)
    }
}
