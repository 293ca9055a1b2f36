//! The effect runner: launches and cancels per-stage async work.
//!
//! The runner subscribes to state transitions and reconciles the active
//! stage against the registry. Its key is `(FlowName, Step, stage_epoch)`;
//! the epoch makes re-entering the same stage (token selection, clarify
//! resubmit) a distinct instance, so the superseded effect is cancelled and
//! a fresh one launched. Effects never mutate state directly; results come
//! back as events through the dispatcher, and the reducer's stage guards
//! plus the cancellation check make stale results harmless.

use chainflow_core::domain::FlowName;
use chainflow_core::error::FlowError;
use chainflow_core::event::{Dispatcher, Event};
use chainflow_core::registry::{EffectContext, FlowRegistry};
use chainflow_core::services::Services;
use chainflow_core::state::{AppState, Step};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Grace periods for terminal stages before the flow auto-dismisses.
#[derive(Debug, Clone)]
pub struct EffectRunnerConfig {
    /// Dwell time on `Success` before `FlowCancel`.
    pub success_grace: Duration,
    /// Dwell time on `Failure` before `FlowCancel`; longer so the user can
    /// read the error and retry.
    pub failure_grace: Duration,
}

impl Default for EffectRunnerConfig {
    fn default() -> Self {
        Self { success_grace: Duration::from_secs(4), failure_grace: Duration::from_secs(10) }
    }
}

struct ActiveStage {
    key: (FlowName, Step, u64),
    token: CancellationToken,
}

/// Reconciles the active stage against registry-declared effects.
pub struct EffectRunner {
    registry: Arc<FlowRegistry>,
    services: Arc<Services>,
    dispatcher: Dispatcher,
    root: CancellationToken,
    config: EffectRunnerConfig,
}

impl EffectRunner {
    /// New runner. `root` cancels every in-flight stage effect on shutdown.
    #[must_use]
    pub const fn new(
        registry: Arc<FlowRegistry>,
        services: Arc<Services>,
        dispatcher: Dispatcher,
        root: CancellationToken,
        config: EffectRunnerConfig,
    ) -> Self {
        Self { registry, services, dispatcher, root, config }
    }

    /// Drive the runner off a store subscription until shutdown.
    pub fn spawn(self, rx: watch::Receiver<Arc<AppState>>) -> JoinHandle<()> {
        tokio::spawn(self.run(rx))
    }

    async fn run(self, mut rx: watch::Receiver<Arc<AppState>>) {
        let mut active: Option<ActiveStage> = None;

        loop {
            let state = Arc::clone(&rx.borrow_and_update());
            self.reconcile(&state, &mut active);

            tokio::select! {
                () = self.root.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                },
            }
        }

        if let Some(stage) = active.take() {
            stage.token.cancel();
        }
        tracing::debug!("effect runner stopped");
    }

    fn reconcile(&self, state: &AppState, active: &mut Option<ActiveStage>) {
        let desired = state.flow.as_ref().map(|f| (f.name, f.step, f.stage_epoch));
        if desired == active.as_ref().map(|a| a.key) {
            return;
        }

        if let Some(stale) = active.take() {
            tracing::debug!(key = ?stale.key, "cancelling superseded stage effect");
            metrics::counter!("effects.cancelled").increment(1);
            stale.token.cancel();
        }

        let Some(flow) = &state.flow else { return };
        let key = (flow.name, flow.step, flow.stage_epoch);
        let token = self.root.child_token();

        if let Some(spec) = self.registry.get(flow.name, flow.step) {
            if let Some(entry) = &spec.entry {
                let ctx = EffectContext {
                    flow: flow.clone(),
                    core: state.core.clone(),
                    services: Arc::clone(&self.services),
                    dispatcher: self.dispatcher.clone(),
                    cancel: token.clone(),
                };
                tracing::debug!(flow = %flow.name, step = ?flow.step, epoch = flow.stage_epoch, "launching stage effect");
                metrics::counter!("effects.launched").increment(1);
                self.supervise(flow.step, entry(ctx), token.clone());
            }

            if let Some(auto) = &spec.auto_advance {
                if let Some(event) = auto(flow, &state.core) {
                    tracing::debug!(flow = %flow.name, step = ?flow.step, "auto-advancing stage");
                    self.dispatcher.dispatch(event);
                }
            }
        }

        if flow.step.is_terminal() {
            let grace = if flow.step == Step::Success {
                self.config.success_grace
            } else {
                self.config.failure_grace
            };
            let timer = token.clone();
            let dispatcher = self.dispatcher.clone();
            tokio::spawn(async move {
                tokio::select! {
                    () = timer.cancelled() => {},
                    () = tokio::time::sleep(grace) => dispatcher.dispatch(Event::FlowCancel),
                }
            });
        }

        *active = Some(ActiveStage { key, token });
    }

    /// Await the effect task and translate its outcome into events.
    ///
    /// A clean `Err` becomes `StageFail` with the effect's own code; a panic
    /// becomes `StageFail` with `EffectError`. Either is suppressed when the
    /// stage instance was cancelled in the meantime.
    fn supervise(
        &self,
        step: Step,
        fut: chainflow_core::registry::StageFuture,
        token: CancellationToken,
    ) {
        let dispatcher = self.dispatcher.clone();
        let task = tokio::spawn(fut);
        tokio::spawn(async move {
            match task.await {
                Ok(Ok(())) => {},
                Ok(Err(error)) => {
                    if token.is_cancelled() {
                        tracing::debug!(?step, "suppressing failure from cancelled effect");
                        return;
                    }
                    dispatcher.dispatch(Event::StageFail { step, error });
                },
                Err(join_error) if join_error.is_panic() => {
                    metrics::counter!("effects.panicked").increment(1);
                    tracing::error!(?step, "stage effect panicked");
                    if !token.is_cancelled() {
                        dispatcher.dispatch(Event::StageFail {
                            step,
                            error: FlowError::effect_error(step),
                        });
                    }
                },
                Err(_) => {},
            }
        });
    }
}

impl std::fmt::Debug for EffectRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectRunner").field("config", &self.config).finish_non_exhaustive()
    }
}
