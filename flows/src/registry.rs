//! Standard registry wiring for the four pipelines.
//!
//! All four flows share the same stage chain; they differ only in the plan
//! stage. Transfer needs no route, so its plan stage has no entry effect and
//! auto-advances with a direct single-step route. Confirm and Clarify have
//! no entry effect anywhere: Confirm waits for an explicit `FlowConfirm`,
//! Clarify for resubmitted input.

use crate::stages;
use crate::FlowsConfig;
use chainflow_core::domain::{FlowName, Route};
use chainflow_core::event::{Event, StagePayload};
use chainflow_core::registry::{FlowRegistry, StageSpec, entry_effect};
use chainflow_core::state::Step;
use std::sync::Arc;

/// Build the production registry.
#[must_use]
#[allow(clippy::too_many_lines)] // one declarative table, one stage per block
pub fn standard_registry(config: &FlowsConfig) -> FlowRegistry {
    let mut registry = FlowRegistry::new();

    for name in FlowName::ALL {
        registry.insert(
            name,
            Step::Parse,
            StageSpec {
                next: Some(Step::Normalize),
                entry: Some(entry_effect(stages::parse)),
                ..StageSpec::default()
            },
        );

        registry.insert(
            name,
            Step::Normalize,
            StageSpec {
                next: Some(Step::Validate),
                entry: Some(entry_effect(stages::normalize)),
                ..StageSpec::default()
            },
        );

        registry.insert(
            name,
            Step::Validate,
            StageSpec {
                next: Some(Step::Plan),
                entry: Some(entry_effect(stages::validate)),
                ..StageSpec::default()
            },
        );

        let plan_spec = if name == FlowName::Transfer {
            // Nothing to plan for a plain transfer: synthesize the direct
            // route and move on.
            StageSpec {
                next: Some(Step::Simulate),
                auto_advance: Some(Arc::new(|flow, _core| {
                    let norm = flow.norm.as_ref()?;
                    let route = Route::direct(norm.requested_final_token().clone());
                    Some(Event::stage_ok(StagePayload::Plan(route)))
                })),
                ..StageSpec::default()
            }
        } else {
            let slippage_bps = config.slippage_bps;
            StageSpec {
                next: Some(Step::Simulate),
                entry: Some(entry_effect(move |ctx| stages::plan(ctx, slippage_bps))),
                ..StageSpec::default()
            }
        };
        registry.insert(name, Step::Plan, plan_spec);

        registry.insert(
            name,
            Step::Simulate,
            StageSpec {
                next: Some(Step::Confirm),
                entry: Some(entry_effect(stages::simulate)),
                ..StageSpec::default()
            },
        );

        // Confirm awaits an explicit FlowConfirm; back returns to the
        // simulation summary.
        registry.insert(
            name,
            Step::Confirm,
            StageSpec {
                next: Some(Step::Execute),
                back: Some(Step::Simulate),
                ..StageSpec::default()
            },
        );

        let exec_config = config.clone();
        registry.insert(
            name,
            Step::Execute,
            StageSpec {
                next: Some(Step::Monitor),
                entry: Some(entry_effect(move |ctx| {
                    stages::execute(ctx, exec_config.clone())
                })),
                ..StageSpec::default()
            },
        );

        let monitor_config = config.clone();
        registry.insert(
            name,
            Step::Monitor,
            StageSpec {
                next: Some(Step::Success),
                entry: Some(entry_effect(move |ctx| {
                    stages::monitor(ctx, monitor_config.clone())
                })),
                ..StageSpec::default()
            },
        );

        registry.insert(
            name,
            Step::Success,
            StageSpec { entry: Some(entry_effect(stages::success_entry)), ..StageSpec::default() },
        );

        registry.insert(
            name,
            Step::Failure,
            StageSpec { entry: Some(entry_effect(stages::failure_entry)), ..StageSpec::default() },
        );
    }

    registry
}
