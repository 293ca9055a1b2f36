//! The pure reducer: `(state, event) → state`.
//!
//! State lives behind `Arc`; the reducer clones-on-write and returns the
//! original `Arc` untouched whenever an event produces no semantic change,
//! so subscribers (and the effect runner) can use `Arc::ptr_eq` to skip
//! work. Stage order is always taken from the [`FlowRegistry`]; the reducer
//! itself knows no pipeline shapes.

use crate::event::{Event, StagePayload};
use crate::registry::FlowRegistry;
use crate::state::{AppState, ClarifyRequest, FlowContext, Mode, Step, TokenSelection};
use std::sync::Arc;

/// Pure transition function over shared state.
pub trait Reducer: Send + Sync {
    /// State type this reducer operates on.
    type State;
    /// Event type this reducer processes.
    type Event;

    /// Apply an event. Must return the same `Arc` when nothing changed.
    fn reduce(&self, state: &Arc<Self::State>, event: &Self::Event) -> Arc<Self::State>;
}

/// Reducer for the transaction-flow state machine.
#[derive(Debug, Clone)]
pub struct FlowReducer {
    registry: Arc<FlowRegistry>,
}

impl FlowReducer {
    /// Reducer consulting the given registry for stage order.
    #[must_use]
    pub const fn new(registry: Arc<FlowRegistry>) -> Self {
        Self { registry }
    }

    fn input_submitted(&self, state: &Arc<AppState>) -> Arc<AppState> {
        // Resubmission while awaiting clarification re-enters parse with the
        // amended text. Candidates offered before the clarify are stale by
        // then, so the token-selection sub-state is dropped.
        if let Some(flow) = &state.flow {
            if flow.step != Step::Clarify {
                // Input is inert mid-flow; the UI disables it, and a flow is
                // never silently replaced while in flight.
                return Arc::clone(state);
            }
            let text = state.input_text.trim();
            if text.is_empty() {
                return Arc::clone(state);
            }
            let mut next = (**state).clone();
            let mut fresh = FlowContext::new(text);
            fresh.stage_epoch = flow.stage_epoch + 1;
            next.flow = Some(fresh);
            next.input_text.clear();
            return Arc::new(next);
        }

        if state.mode != Mode::Idle {
            return Arc::clone(state);
        }
        let text = state.input_text.trim();
        if text.is_empty() {
            return Arc::clone(state);
        }
        let mut next = (**state).clone();
        next.flow = Some(FlowContext::new(text));
        next.mode = Mode::Flow;
        next.input_text.clear();
        Arc::new(next)
    }

    fn stage_ok(
        &self,
        state: &Arc<AppState>,
        step: Step,
        payload: &StagePayload,
    ) -> Arc<AppState> {
        let Some(flow) = &state.flow else { return Arc::clone(state) };
        if flow.step != step || payload.expected_step() != step {
            tracing::debug!(target = ?step, current = ?flow.step, "ignoring stale stage outcome");
            return Arc::clone(state);
        }

        let mut next = (**state).clone();
        let Some(flow_mut) = next.flow.as_mut() else { return Arc::clone(state) };

        match payload {
            StagePayload::Intent(intent) => {
                flow_mut.name = intent.flow_name();
                flow_mut.intent = Some(intent.clone());
            },
            StagePayload::Norm(norm) => flow_mut.norm = Some(norm.clone()),
            StagePayload::Validated => {},
            StagePayload::Plan(route) => flow_mut.plan = Some(route.clone()),
            StagePayload::Sim(report) => flow_mut.sim = Some(report.clone()),
            StagePayload::Exec(receipt) => {
                flow_mut.exec = Some(receipt.clone());
                if let Some(fp) = &flow_mut.fingerprint {
                    next.core.idempotency.mark_submitted(fp, receipt.tx_hash.clone());
                }
            },
            StagePayload::Monitor(report) => flow_mut.monitor = Some(report.clone()),
        }

        match self.registry.next(flow_mut.name, step) {
            Some(successor) => flow_mut.step = successor,
            None => {
                tracing::warn!(flow = %flow_mut.name, step = ?step, "no registry edge after stage");
            },
        }
        Arc::new(next)
    }

    fn advance_from(&self, state: &Arc<AppState>, expected: Step) -> Arc<AppState> {
        let Some(flow) = &state.flow else { return Arc::clone(state) };
        if flow.step != expected {
            return Arc::clone(state);
        }
        let Some(successor) = self.registry.next(flow.name, expected) else {
            return Arc::clone(state);
        };
        let mut next = (**state).clone();
        if let Some(flow_mut) = next.flow.as_mut() {
            flow_mut.step = successor;
        }
        Arc::new(next)
    }
}

#[allow(clippy::too_many_lines)] // single exhaustive match over the event vocabulary
impl Reducer for FlowReducer {
    type State = AppState;
    type Event = Event;

    fn reduce(&self, state: &Arc<AppState>, event: &Event) -> Arc<AppState> {
        match event {
            Event::InputChanged(text) => {
                if state.input_text == *text {
                    return Arc::clone(state);
                }
                let mut next = (**state).clone();
                next.input_text.clone_from(text);
                Arc::new(next)
            },

            Event::InputSubmitted => self.input_submitted(state),

            Event::StageOk { step, payload } => self.stage_ok(state, *step, payload),

            Event::StageFail { step, error } => {
                let Some(flow) = &state.flow else { return Arc::clone(state) };
                if flow.step != *step {
                    tracing::debug!(target = ?step, current = ?flow.step, "ignoring stale failure");
                    return Arc::clone(state);
                }
                let mut next = (**state).clone();
                let Some(flow_mut) = next.flow.as_mut() else { return Arc::clone(state) };
                flow_mut.error = Some(error.clone());
                flow_mut.step = Step::Failure;
                if let Some(fp) = &flow_mut.fingerprint {
                    next.core.idempotency.mark_failed(fp);
                }
                Arc::new(next)
            },

            Event::StageClarify { step, prompt, missing } => {
                let Some(flow) = &state.flow else { return Arc::clone(state) };
                if flow.step != *step {
                    return Arc::clone(state);
                }
                let mut next = (**state).clone();
                if let Some(flow_mut) = next.flow.as_mut() {
                    flow_mut.step = Step::Clarify;
                    flow_mut.clarify =
                        Some(ClarifyRequest { prompt: prompt.clone(), missing: missing.clone() });
                }
                Arc::new(next)
            },

            Event::StageTokenSelection { step, symbol, candidates } => {
                let Some(flow) = &state.flow else { return Arc::clone(state) };
                if flow.step != *step {
                    return Arc::clone(state);
                }
                let mut next = (**state).clone();
                if let Some(flow_mut) = next.flow.as_mut() {
                    flow_mut.token_selection = Some(TokenSelection {
                        symbol: symbol.clone(),
                        candidates: candidates.clone(),
                        origin: *step,
                    });
                    flow_mut.selected_token_index = None;
                }
                Arc::new(next)
            },

            Event::TokenSelected(index) => {
                let Some(flow) = &state.flow else { return Arc::clone(state) };
                let Some(selection) = &flow.token_selection else { return Arc::clone(state) };
                if flow.step != selection.origin || *index >= selection.candidates.len() {
                    return Arc::clone(state);
                }
                let mut next = (**state).clone();
                if let Some(flow_mut) = next.flow.as_mut() {
                    flow_mut.selected_token_index = Some(*index);
                    // Same stage, new epoch: the entry effect re-runs with the
                    // selection applied.
                    flow_mut.stage_epoch += 1;
                }
                Arc::new(next)
            },

            Event::LedgerRecord { fingerprint, bucket } => {
                let Some(flow) = &state.flow else { return Arc::clone(state) };
                if flow.step != Step::Execute {
                    return Arc::clone(state);
                }
                let mut next = (**state).clone();
                next.core.idempotency.record(fingerprint.clone(), *bucket);
                if let Some(flow_mut) = next.flow.as_mut() {
                    flow_mut.fingerprint = Some(fingerprint.clone());
                }
                Arc::new(next)
            },

            Event::FlowCancel => {
                if state.flow.is_none() {
                    return Arc::clone(state);
                }
                let mut next = (**state).clone();
                next.flow = None;
                next.mode = if next.view_stack.is_empty() { Mode::Idle } else { Mode::View };
                Arc::new(next)
            },

            Event::FlowRetry => {
                let Some(flow) = &state.flow else { return Arc::clone(state) };
                let mut next = (**state).clone();
                let mut fresh = FlowContext::new(flow.raw.clone());
                fresh.stage_epoch = flow.stage_epoch + 1;
                next.flow = Some(fresh);
                Arc::new(next)
            },

            Event::FlowBack => {
                let Some(flow) = &state.flow else { return Arc::clone(state) };
                let Some(previous) = self.registry.back(flow.name, flow.step) else {
                    return Arc::clone(state);
                };
                let mut next = (**state).clone();
                if let Some(flow_mut) = next.flow.as_mut() {
                    flow_mut.step = previous;
                    flow_mut.stage_epoch += 1;
                    flow_mut.error = None;
                }
                Arc::new(next)
            },

            Event::FlowConfirm => self.advance_from(state, Step::Confirm),

            Event::ChatAdd(entry) => {
                let mut next = (**state).clone();
                next.chat.push(entry.clone());
                Arc::new(next)
            },

            Event::OverlayPush(overlay) => {
                let mut next = (**state).clone();
                next.overlays.push(overlay.clone());
                Arc::new(next)
            },

            Event::OverlayPop(target) => {
                let mut next = (**state).clone();
                let removed = match target {
                    Some(id) => {
                        let before = next.overlays.len();
                        next.overlays.retain(|o| o.id != *id);
                        next.overlays.len() != before
                    },
                    None => next.overlays.pop().is_some(),
                };
                if removed { Arc::new(next) } else { Arc::clone(state) }
            },

            Event::ViewPush(frame) => {
                let mut next = (**state).clone();
                next.view_stack.push(frame.clone());
                if next.flow.is_none() {
                    next.mode = Mode::View;
                }
                Arc::new(next)
            },

            Event::ViewPop => {
                if state.view_stack.is_empty() {
                    return Arc::clone(state);
                }
                let mut next = (**state).clone();
                next.view_stack.pop();
                if next.view_stack.is_empty() && next.mode == Mode::View {
                    next.mode = Mode::Idle;
                }
                Arc::new(next)
            },

            Event::Tick { now } => {
                if state.overlays.iter().all(|o| o.deadline > *now) {
                    return Arc::clone(state);
                }
                let mut next = (**state).clone();
                next.overlays.retain(|o| o.deadline > *now);
                Arc::new(next)
            },

            Event::AuthChanged { wallet, sender } => {
                if state.core.wallet == *wallet && state.core.sender == *sender {
                    return Arc::clone(state);
                }
                let mut next = (**state).clone();
                next.core.wallet.clone_from(wallet);
                next.core.sender.clone_from(sender);
                Arc::new(next)
            },

            Event::ChainSelected(chain_id) => {
                if state.core.chain_id == *chain_id {
                    return Arc::clone(state);
                }
                let mut next = (**state).clone();
                next.core.chain_id = *chain_id;
                Arc::new(next)
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::{
        Address, Amount, ChainId, ExecReceipt, FlowName, Intent, Route, TokenInfo, TxHash,
    };
    use crate::error::{ErrorCode, FlowError};
    use crate::ledger::LedgerStatus;
    use crate::registry::StageSpec;
    use crate::state::{CoreContext, Overlay};
    use chrono::{TimeZone, Utc};

    fn linear_registry() -> Arc<FlowRegistry> {
        let chain = [
            Step::Parse,
            Step::Normalize,
            Step::Validate,
            Step::Plan,
            Step::Simulate,
            Step::Confirm,
            Step::Execute,
            Step::Monitor,
            Step::Success,
        ];
        let mut reg = FlowRegistry::new();
        for name in FlowName::ALL {
            for pair in chain.windows(2) {
                reg.insert(name, pair[0], StageSpec { next: Some(pair[1]), ..StageSpec::default() });
            }
            reg.insert(
                name,
                Step::Confirm,
                StageSpec {
                    next: Some(Step::Execute),
                    back: Some(Step::Simulate),
                    ..StageSpec::default()
                },
            );
        }
        Arc::new(reg)
    }

    fn reducer() -> FlowReducer {
        FlowReducer::new(linear_registry())
    }

    fn idle_state() -> Arc<AppState> {
        Arc::new(AppState::new(CoreContext::new(ChainId(1))))
    }

    fn eth() -> TokenInfo {
        TokenInfo {
            symbol: "ETH".to_string(),
            address: Address("0x0000000000000000000000000000000000000000".to_string()),
            chain_id: ChainId(1),
            decimals: 18,
        }
    }

    fn transfer_intent() -> Intent {
        Intent::Transfer {
            token: "ETH".to_string(),
            amount: Amount(1_000_000_000_000_000),
            to: Address("0xABC".to_string()),
        }
    }

    fn flow_state_at(step: Step) -> Arc<AppState> {
        let mut state = AppState::new(CoreContext::new(ChainId(1)));
        let mut flow = FlowContext::new("transfer 0.001 ETH to 0xABC");
        flow.step = step;
        state.flow = Some(flow);
        state.mode = Mode::Flow;
        Arc::new(state)
    }

    #[test]
    fn input_submitted_creates_flow_and_clears_input() {
        let r = reducer();
        let mut base = (*idle_state()).clone();
        base.input_text = "transfer 0.001 ETH to 0xABC".to_string();
        let state = Arc::new(base);

        let next = r.reduce(&state, &Event::InputSubmitted);
        assert_eq!(next.mode, Mode::Flow);
        let flow = next.flow.as_ref().unwrap();
        assert_eq!(flow.step, Step::Parse);
        assert_eq!(flow.raw, "transfer 0.001 ETH to 0xABC");
        assert!(next.input_text.is_empty());
    }

    #[test]
    fn empty_input_submission_is_a_noop() {
        let r = reducer();
        let state = idle_state();
        let next = r.reduce(&state, &Event::InputSubmitted);
        assert!(Arc::ptr_eq(&state, &next));
    }

    #[test]
    fn mismatched_stage_outcome_returns_same_reference() {
        let r = reducer();
        let state = flow_state_at(Step::Simulate);

        // A straggling parse result from a cancelled effect.
        let event = Event::stage_ok(StagePayload::Intent(transfer_intent()));
        let next = r.reduce(&state, &event);
        assert!(Arc::ptr_eq(&state, &next));
    }

    #[test]
    fn stage_outcome_without_flow_returns_same_reference() {
        let r = reducer();
        let state = idle_state();
        let event = Event::stage_ok(StagePayload::Intent(transfer_intent()));
        let next = r.reduce(&state, &event);
        assert!(Arc::ptr_eq(&state, &next));
    }

    #[test]
    fn duplicate_stage_ok_is_idempotent_after_first_acceptance() {
        let r = reducer();
        let state = flow_state_at(Step::Parse);
        let event = Event::stage_ok(StagePayload::Intent(transfer_intent()));

        let once = r.reduce(&state, &event);
        assert_eq!(once.flow.as_ref().unwrap().step, Step::Normalize);

        // Replaying the same event no longer matches the current stage.
        let twice = r.reduce(&once, &event);
        assert!(Arc::ptr_eq(&once, &twice));
    }

    #[test]
    fn parse_ok_assigns_resolved_flow_name() {
        let r = reducer();
        let state = flow_state_at(Step::Parse);
        let intent = Intent::Swap {
            from_token: "USDC".to_string(),
            to_token: "WETH".to_string(),
            amount: Amount(5_000_000),
        };
        let next = r.reduce(&state, &Event::stage_ok(StagePayload::Intent(intent)));
        let flow = next.flow.as_ref().unwrap();
        assert_eq!(flow.name, FlowName::Swap);
        assert_eq!(flow.step, Step::Normalize);
        assert!(flow.intent.is_some());
    }

    #[test]
    fn wrong_payload_kind_for_step_is_ignored() {
        let r = reducer();
        let state = flow_state_at(Step::Parse);
        // A plan payload claiming to be a parse outcome.
        let event =
            Event::StageOk { step: Step::Parse, payload: StagePayload::Plan(Route::direct(eth())) };
        let next = r.reduce(&state, &event);
        assert!(Arc::ptr_eq(&state, &next));
    }

    #[test]
    fn stage_fail_sets_error_and_enters_failure() {
        let r = reducer();
        let state = flow_state_at(Step::Plan);
        let error = FlowError::new(ErrorCode::NoRouteFound, Step::Plan, "no route");
        let next =
            r.reduce(&state, &Event::StageFail { step: Step::Plan, error: error.clone() });
        let flow = next.flow.as_ref().unwrap();
        assert_eq!(flow.step, Step::Failure);
        assert_eq!(flow.error.as_ref().unwrap().code, ErrorCode::NoRouteFound);
    }

    #[test]
    fn stage_fail_marks_ledger_entry_failed() {
        let r = reducer();
        let state = flow_state_at(Step::Execute);

        let recorded = r.reduce(
            &state,
            &Event::LedgerRecord { fingerprint: "fp-1".to_string(), bucket: 3 },
        );
        assert_eq!(recorded.flow.as_ref().unwrap().fingerprint.as_deref(), Some("fp-1"));

        let failed = r.reduce(
            &recorded,
            &Event::StageFail {
                step: Step::Execute,
                error: FlowError::new(ErrorCode::ExecutionFailed, Step::Execute, "boom"),
            },
        );
        assert_eq!(
            failed.core.idempotency.get("fp-1").map(|e| e.status),
            Some(LedgerStatus::Failed)
        );
    }

    #[test]
    fn execute_ok_attaches_tx_to_ledger_entry() {
        let r = reducer();
        let state = flow_state_at(Step::Execute);
        let recorded = r.reduce(
            &state,
            &Event::LedgerRecord { fingerprint: "fp-2".to_string(), bucket: 3 },
        );

        let receipt = ExecReceipt {
            tx_hash: TxHash("0xbeef".to_string()),
            explorer_url: "https://example.org/tx/0xbeef".to_string(),
            message: "submitted".to_string(),
        };
        let done = r.reduce(&recorded, &Event::stage_ok(StagePayload::Exec(receipt)));
        let entry = done.core.idempotency.get("fp-2").unwrap();
        assert_eq!(entry.status, LedgerStatus::Submitted);
        assert_eq!(entry.tx_hash.as_ref().map(|h| h.0.as_str()), Some("0xbeef"));
        assert_eq!(done.flow.as_ref().unwrap().step, Step::Monitor);
    }

    #[test]
    fn flow_retry_resets_to_parse_preserving_raw() {
        let r = reducer();
        let state = flow_state_at(Step::Failure);
        let raw = state.flow.as_ref().unwrap().raw.clone();

        let next = r.reduce(&state, &Event::FlowRetry);
        let flow = next.flow.as_ref().unwrap();
        assert_eq!(flow.step, Step::Parse);
        assert_eq!(flow.raw, raw);
        assert!(flow.error.is_none());
        assert!(flow.intent.is_none());
    }

    #[test]
    fn flow_retry_clears_token_selection_state() {
        let r = reducer();
        let mut base = (*flow_state_at(Step::Normalize)).clone();
        if let Some(flow) = base.flow.as_mut() {
            flow.token_selection = Some(TokenSelection {
                symbol: "USDC".to_string(),
                candidates: vec![eth()],
                origin: Step::Normalize,
            });
            flow.selected_token_index = Some(0);
        }
        let state = Arc::new(base);

        let next = r.reduce(&state, &Event::FlowRetry);
        let flow = next.flow.as_ref().unwrap();
        assert!(flow.token_selection.is_none());
        assert!(flow.selected_token_index.is_none());
    }

    #[test]
    fn clarify_then_resubmit_reenters_parse_with_amended_text() {
        let r = reducer();
        let state = flow_state_at(Step::Parse);
        let clarified = r.reduce(
            &state,
            &Event::StageClarify {
                step: Step::Parse,
                prompt: "to whom?".to_string(),
                missing: vec!["to".to_string()],
            },
        );
        assert_eq!(clarified.flow.as_ref().unwrap().step, Step::Clarify);

        let mut typed = (*clarified).clone();
        typed.input_text = "transfer 0.001 ETH to 0xABC".to_string();
        let resubmitted = r.reduce(&Arc::new(typed), &Event::InputSubmitted);
        let flow = resubmitted.flow.as_ref().unwrap();
        assert_eq!(flow.step, Step::Parse);
        assert_eq!(flow.raw, "transfer 0.001 ETH to 0xABC");
        assert!(flow.token_selection.is_none());
        assert!(flow.clarify.is_none());
    }

    #[test]
    fn token_selection_and_pick_bump_epoch_on_same_stage() {
        let r = reducer();
        let state = flow_state_at(Step::Normalize);
        let offered = r.reduce(
            &state,
            &Event::StageTokenSelection {
                step: Step::Normalize,
                symbol: "USDC".to_string(),
                candidates: vec![eth(), eth()],
            },
        );
        let before = offered.flow.as_ref().unwrap().stage_epoch;

        let picked = r.reduce(&offered, &Event::TokenSelected(1));
        let flow = picked.flow.as_ref().unwrap();
        assert_eq!(flow.selected_token_index, Some(1));
        assert_eq!(flow.step, Step::Normalize);
        assert_eq!(flow.stage_epoch, before + 1);

        // Out-of-range pick is ignored.
        let bogus = r.reduce(&picked, &Event::TokenSelected(9));
        assert!(Arc::ptr_eq(&picked, &bogus));
    }

    #[test]
    fn flow_confirm_advances_only_from_confirm() {
        let r = reducer();
        let at_confirm = flow_state_at(Step::Confirm);
        let next = r.reduce(&at_confirm, &Event::FlowConfirm);
        assert_eq!(next.flow.as_ref().unwrap().step, Step::Execute);

        let elsewhere = flow_state_at(Step::Simulate);
        let noop = r.reduce(&elsewhere, &Event::FlowConfirm);
        assert!(Arc::ptr_eq(&elsewhere, &noop));
    }

    #[test]
    fn flow_back_follows_registry_back_edge() {
        let r = reducer();
        let state = flow_state_at(Step::Confirm);
        let next = r.reduce(&state, &Event::FlowBack);
        assert_eq!(next.flow.as_ref().unwrap().step, Step::Simulate);

        // No back edge declared for parse.
        let parse = flow_state_at(Step::Parse);
        let noop = r.reduce(&parse, &Event::FlowBack);
        assert!(Arc::ptr_eq(&parse, &noop));
    }

    #[test]
    fn flow_cancel_tears_down_to_idle() {
        let r = reducer();
        let state = flow_state_at(Step::Monitor);
        let next = r.reduce(&state, &Event::FlowCancel);
        assert!(next.flow.is_none());
        assert_eq!(next.mode, Mode::Idle);

        let again = r.reduce(&next, &Event::FlowCancel);
        assert!(Arc::ptr_eq(&next, &again));
    }

    #[test]
    fn tick_prunes_expired_overlays_only() {
        let r = reducer();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut base = (*idle_state()).clone();
        base.overlays.push(Overlay::toast("old", t0));
        base.overlays.push(Overlay::toast("fresh", t0 + chrono::Duration::seconds(30)));
        let state = Arc::new(base);

        let pruned = r.reduce(&state, &Event::Tick { now: t0 + chrono::Duration::seconds(1) });
        assert_eq!(pruned.overlays.len(), 1);
        assert_eq!(pruned.overlays[0].text, "fresh");

        // Nothing left to prune: same reference.
        let idle = r.reduce(&pruned, &Event::Tick { now: t0 + chrono::Duration::seconds(2) });
        assert!(Arc::ptr_eq(&pruned, &idle));
    }

    #[test]
    fn overlay_pop_by_id_and_topmost() {
        let r = reducer();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let first = Overlay::toast("first", t0);
        let second = Overlay::toast("second", t0);
        let mut base = (*idle_state()).clone();
        base.overlays.push(first.clone());
        base.overlays.push(second);
        let state = Arc::new(base);

        let by_id = r.reduce(&state, &Event::OverlayPop(Some(first.id)));
        assert_eq!(by_id.overlays.len(), 1);
        assert_eq!(by_id.overlays[0].text, "second");

        let topmost = r.reduce(&by_id, &Event::OverlayPop(None));
        assert!(topmost.overlays.is_empty());

        let empty = r.reduce(&topmost, &Event::OverlayPop(None));
        assert!(Arc::ptr_eq(&topmost, &empty));
    }

    #[test]
    fn unchanged_input_text_is_same_reference() {
        let r = reducer();
        let state = idle_state();
        let next = r.reduce(&state, &Event::InputChanged(String::new()));
        assert!(Arc::ptr_eq(&state, &next));
    }
}
