//! Baseline context priming.
//!
//! Every key the instruction template references gets a safe default first;
//! store enrichment is overlaid best-effort on top.

use std::collections::HashMap;

use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::types::keys;
use crate::artifacts::ArtifactStore;
use crate::storage::queries::{self, WeddingMembership};
use crate::storage::{Store, StoreError};

/// Number of recent artifacts listed in the context.
const RECENT_ARTIFACTS: usize = 5;

/// Empty values for every context key.
pub fn safe_defaults() -> Map<String, Value> {
    let defaults = json!({
        "user_display_name": "there",
        "user_email": "",
        "current_user_role": "unknown",
        "current_wedding_id": null,
        "current_user_id": null,
        "wedding_data": {},
        "active_workflows": [],
        "relevant_tasks": [],
        "urgent_tasks": [],
        "overdue_tasks": [],
        "upcoming_deadlines": [],
        "upcoming_events": [],
        "timeline_summary": { "upcoming_count": 0, "overdue_count": 0, "urgent_count": 0 },
        "budget_totals": { "total": 0.0, "paid": 0.0, "pending": 0.0, "items": 0 },
        "budget_summary": [],
        "shortlisted_vendors": [],
        "pending_actions": { "pending_reviews": [], "awaiting_workflows": [] },
        "recent_artifacts": [],
    });
    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Build the primed state for a session.
///
/// Never fails: each slice error is logged and leaves that slice's defaults.
pub async fn prime_context(
    store: &dyn Store,
    artifacts: &dyn ArtifactStore,
    user_id: &str,
    membership: Option<&WeddingMembership>,
    list_caps: &HashMap<String, usize>,
) -> Map<String, Value> {
    let mut context = safe_defaults();
    context.insert(keys::CURRENT_USER_ID.into(), json!(user_id));

    let Some(membership) = membership else {
        return context;
    };
    let wedding_id = membership.wedding_id.as_str();
    context.insert(keys::CURRENT_WEDDING_ID.into(), json!(wedding_id));
    context.insert(keys::CURRENT_USER_ROLE.into(), json!(membership.role));

    let today = Utc::now().date_naive();

    let slices: Vec<(&str, BoxFuture<'_, SliceResult>)> = vec![
        ("core", queries::core_slice(store, wedding_id, user_id).boxed()),
        ("tasks", queries::tasks_slice(store, wedding_id).boxed()),
        ("timeline", queries::timeline_slice(store, wedding_id, today).boxed()),
        ("budget", queries::budget_slice(store, wedding_id).boxed()),
        ("vendors", queries::vendors_slice(store, wedding_id).boxed()),
        (
            "pending_actions",
            queries::pending_actions_slice(store, wedding_id, &membership.role).boxed(),
        ),
    ];
    let (names, futures): (Vec<_>, Vec<_>) = slices.into_iter().unzip();

    for (name, result) in names.into_iter().zip(join_all(futures).await) {
        match result {
            Ok(values) => {
                debug!(slice = name, keys = values.len(), "Context slice loaded");
                context.extend(values);
            }
            Err(e) => warn!(slice = name, error = %e, "Context slice failed, keeping defaults"),
        }
    }

    match artifacts.recent(wedding_id, RECENT_ARTIFACTS).await {
        Ok(recent) => {
            let listed: Vec<Value> = recent
                .into_iter()
                .map(|a| {
                    json!({
                        "filename": a.filename,
                        "mime_type": a.mime_type,
                        "caption": a.caption,
                    })
                })
                .collect();
            context.insert("recent_artifacts".into(), Value::Array(listed));
        }
        Err(e) => warn!(error = %e, "Recent artifacts unavailable"),
    }

    apply_list_caps(&mut context, list_caps);
    context
}

type SliceResult = Result<Map<String, Value>, StoreError>;

/// Truncate list values to their configured caps.
pub fn apply_list_caps(context: &mut Map<String, Value>, caps: &HashMap<String, usize>) {
    for (key, &cap) in caps {
        if let Some(Value::Array(items)) = context.get_mut(key) {
            items.truncate(cap);
        }
    }
}
