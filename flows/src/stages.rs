//! Per-stage entry effects.
//!
//! Every effect receives the stage-entry snapshot in its [`EffectContext`]
//! and communicates results exclusively by dispatching events, always through
//! `dispatch_if_live` so a superseded instance stays silent. Returning `Err`
//! lets the runner synthesize the `StageFail` for this stage.

use crate::FlowsConfig;
use chainflow_core::domain::Route;
use chainflow_core::error::{ErrorCode, FlowError};
use chainflow_core::event::{Event, StagePayload};
use chainflow_core::ledger::fingerprint;
use chainflow_core::registry::EffectContext;
use chainflow_core::services::{NormalizeError, NormalizeHints, Resolution};
use chainflow_core::state::{ChatEntry, Overlay, Step};
use chainflow_runtime::retry::{RetryOutcome, deadline_token, retry_with_backoff};
use chrono::Duration as ChronoDuration;

pub(crate) async fn parse(ctx: EffectContext) -> Result<(), FlowError> {
    let resolution = ctx
        .services
        .resolver
        .resolve(&ctx.flow.raw)
        .await
        .map_err(|err| FlowError::from_service(err, Step::Parse))?;

    match resolution {
        Resolution::Intent(intent) => {
            ctx.dispatch_if_live(Event::stage_ok(StagePayload::Intent(intent)));
        },
        Resolution::Clarify { prompt, missing } => {
            ctx.dispatch_if_live(Event::StageClarify { step: Step::Parse, prompt, missing });
        },
        Resolution::Chat(text) => {
            // Not a transaction after all; answer and stand down.
            let now = ctx.services.clock.now();
            ctx.dispatch_if_live(Event::ChatAdd(ChatEntry::assistant(text, now)));
            ctx.dispatch_if_live(Event::FlowCancel);
        },
        Resolution::TokenSelection { symbol, candidates } => {
            ctx.dispatch_if_live(Event::StageTokenSelection {
                step: Step::Parse,
                symbol,
                candidates,
            });
        },
    }
    Ok(())
}

pub(crate) async fn normalize(ctx: EffectContext) -> Result<(), FlowError> {
    let Some(intent) = &ctx.flow.intent else {
        return Err(FlowError::effect_error(Step::Normalize));
    };
    let hints = NormalizeHints {
        preferred_chain: ctx.core.chain_id,
        sender: ctx.core.sender.clone(),
        token_override: ctx.flow.selected_token().cloned(),
    };

    match ctx.services.normalizer.normalize(intent, &hints).await {
        Ok(norm) => {
            ctx.dispatch_if_live(Event::stage_ok(StagePayload::Norm(norm)));
            Ok(())
        },
        Err(NormalizeError::TokenAmbiguous { symbol, candidates }) => {
            ctx.dispatch_if_live(Event::StageTokenSelection {
                step: Step::Normalize,
                symbol,
                candidates,
            });
            Ok(())
        },
        Err(NormalizeError::Service(err)) => Err(FlowError::from_service(err, Step::Normalize)),
    }
}

pub(crate) async fn validate(ctx: EffectContext) -> Result<(), FlowError> {
    let Some(norm) = &ctx.flow.norm else {
        return Err(FlowError::effect_error(Step::Validate));
    };
    ctx.services
        .simulator
        .validate(norm, ctx.core.sender.as_ref())
        .await
        .map_err(|err| FlowError::from_service(err, Step::Validate))?;
    ctx.dispatch_if_live(Event::stage_ok(StagePayload::Validated));
    Ok(())
}

pub(crate) async fn plan(ctx: EffectContext, slippage_bps: u16) -> Result<(), FlowError> {
    let Some(norm) = &ctx.flow.norm else {
        return Err(FlowError::effect_error(Step::Plan));
    };
    let route = ctx
        .services
        .planner
        .plan(norm, slippage_bps)
        .await
        .map_err(|err| FlowError::from_service(err, Step::Plan))?;

    check_route(&route, norm)?;
    ctx.dispatch_if_live(Event::stage_ok(StagePayload::Plan(route)));
    Ok(())
}

/// Reject a route before it ever reaches state: every leg must deliver the
/// token it declares, and the final leg must deliver what the user asked for.
fn check_route(
    route: &Route,
    norm: &chainflow_core::domain::NormalizedIntent,
) -> Result<(), FlowError> {
    if route.steps.is_empty() {
        return Err(FlowError::new(ErrorCode::NoRouteFound, Step::Plan, "planner returned an empty route"));
    }
    for step in &route.steps {
        if !step.tokens_agree() {
            return Err(FlowError::new(
                ErrorCode::RouteStepTokenMismatch,
                Step::Plan,
                format!("route step delivers a different token than declared: {}", step.description),
            ));
        }
    }
    let requested = norm.requested_final_token();
    let delivered = route.final_token();
    if delivered.is_none_or(|t| t.address != requested.address || t.chain_id != requested.chain_id)
    {
        return Err(FlowError::new(
            ErrorCode::RouteFinalTokenMismatch,
            Step::Plan,
            format!("route does not end in the requested token {}", requested.symbol),
        ));
    }
    Ok(())
}

pub(crate) async fn simulate(ctx: EffectContext) -> Result<(), FlowError> {
    let Some(norm) = &ctx.flow.norm else {
        return Err(FlowError::effect_error(Step::Simulate));
    };
    let report = ctx
        .services
        .simulator
        .simulate(norm, ctx.core.sender.as_ref())
        .await
        .map_err(|err| FlowError::from_service(err, Step::Simulate))?;
    ctx.dispatch_if_live(Event::stage_ok(StagePayload::Sim(report)));
    Ok(())
}

pub(crate) async fn execute(ctx: EffectContext, config: FlowsConfig) -> Result<(), FlowError> {
    let Some(norm) = &ctx.flow.norm else {
        return Err(FlowError::effect_error(Step::Execute));
    };
    let (Some(wallet), Some(sender)) = (&ctx.core.wallet, &ctx.core.sender) else {
        return Err(FlowError::auth_required(Step::Execute));
    };

    // Check-then-record is safe: stage transitions are serialized, so no two
    // execute instances can pass the check concurrently.
    let fp = fingerprint(sender, norm);
    let bucket = ctx.core.idempotency.bucket_for(ctx.services.clock.now());
    if let Some(prior) = ctx.core.idempotency.blocking_entry(&fp, bucket) {
        return Err(FlowError::duplicate(Step::Execute, prior.tx_hash.as_ref()));
    }
    ctx.dispatch_if_live(Event::LedgerRecord { fingerprint: fp, bucket });

    let outcome = retry_with_backoff(&config.retry_policy, &ctx.cancel, || {
        ctx.services.executor.execute(
            norm,
            ctx.core.account_mode,
            wallet,
            ctx.flow.plan.as_ref(),
        )
    })
    .await;

    match outcome {
        RetryOutcome::Ok(receipt) => {
            let now = ctx.services.clock.now();
            ctx.dispatch_if_live(Event::ChatAdd(ChatEntry::assistant(
                format!("{} {}", receipt.message, receipt.explorer_url),
                now,
            )));
            ctx.dispatch_if_live(Event::stage_ok(StagePayload::Exec(receipt)));
            Ok(())
        },
        RetryOutcome::Exhausted(err) => Err(FlowError::from_service(err, Step::Execute)),
        RetryOutcome::Cancelled => Ok(()),
    }
}

pub(crate) async fn monitor(ctx: EffectContext, config: FlowsConfig) -> Result<(), FlowError> {
    let Some(exec) = &ctx.flow.exec else {
        return Err(FlowError::effect_error(Step::Monitor));
    };
    let chain_id = ctx.core.chain_id;
    let deadline = deadline_token(&ctx.cancel, config.monitor_deadline);

    loop {
        if deadline.is_cancelled() {
            if ctx.is_stale() {
                // Flow moved on; nobody is waiting for this result.
                return Ok(());
            }
            return Err(FlowError::new(
                ErrorCode::MonitorTimeout,
                Step::Monitor,
                format!("transaction {} not confirmed in time", exec.tx_hash),
            ));
        }

        match ctx.services.monitor.poll(chain_id, &exec.tx_hash).await {
            Ok(report) => match report.status {
                chainflow_core::domain::TxStatus::Confirmed => {
                    ctx.dispatch_if_live(Event::stage_ok(StagePayload::Monitor(report)));
                    return Ok(());
                },
                chainflow_core::domain::TxStatus::Failed => {
                    return Err(FlowError::new(
                        ErrorCode::TxReverted,
                        Step::Monitor,
                        format!("transaction {} reverted on-chain", exec.tx_hash),
                    ));
                },
                chainflow_core::domain::TxStatus::Pending => {},
            },
            Err(err) => {
                // Transient RPC trouble; the deadline bounds how long we keep trying.
                tracing::warn!(error = %err, tx = %exec.tx_hash, "monitor poll failed");
            },
        }

        tokio::select! {
            () = deadline.cancelled() => {},
            () = tokio::time::sleep(config.monitor_poll_interval) => {},
        }
    }
}

/// Success dwell: narrate and raise a toast; the runner schedules the
/// delayed return to idle.
pub(crate) async fn success_entry(ctx: EffectContext) -> Result<(), FlowError> {
    let now = ctx.services.clock.now();
    let text = ctx.flow.exec.as_ref().map_or_else(
        || format!("{} complete", ctx.flow.name),
        |exec| format!("{} complete: {}", ctx.flow.name, exec.explorer_url),
    );
    ctx.dispatch_if_live(Event::OverlayPush(Overlay::toast(
        text,
        now + ChronoDuration::seconds(4),
    )));
    Ok(())
}

/// Failure dwell: raise a toast with the remediation hint. `AuthRequired`
/// is rendered inline by the UI and stays off the toast channel.
pub(crate) async fn failure_entry(ctx: EffectContext) -> Result<(), FlowError> {
    let Some(error) = &ctx.flow.error else { return Ok(()) };
    if error.code == ErrorCode::AuthRequired {
        return Ok(());
    }
    let now = ctx.services.clock.now();
    ctx.dispatch_if_live(Event::OverlayPush(Overlay::toast(
        format!("{} ({})", error.message, error.code.hint()),
        now + ChronoDuration::seconds(10),
    )));
    Ok(())
}
