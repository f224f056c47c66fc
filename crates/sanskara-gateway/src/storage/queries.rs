//! Wedding queries run at session start.
//!
//! Each slice returns the context keys it owns. Callers overlay them on top
//! of safe defaults, so a failed slice only loses its own keys.

use chrono::{Days, NaiveDate};
use serde_json::{Map, Value, json};

use super::store::{Row, Store, StoreError, params};

/// A user's membership in a wedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeddingMembership {
    pub wedding_id: String,
    pub role: String,
}

/// Workflow states the assistant should keep in mind.
const ACTIVE_WORKFLOW_STATES: &str = "'in_progress', 'paused', 'awaiting_feedback'";

/// Task states that wait on a sign-off.
const REVIEW_STATES: &str = "'pending_review', 'pending_final_approval'";

const OPEN_TASK_COLUMNS: &str = "task_id, title, status, priority, category, lead_party, due_date";

/// Find the wedding a user belongs to.
pub async fn resolve_wedding(
    store: &dyn Store,
    user_id: &str,
) -> Result<Option<WeddingMembership>, StoreError> {
    let rows = store
        .execute(
            "SELECT wedding_id, role FROM wedding_members WHERE user_id = :user_id LIMIT 1",
            &params([("user_id", json!(user_id))]),
        )
        .await?;

    let Some(row) = rows.into_iter().next() else {
        return Ok(None);
    };
    let wedding_id = string_field(&row, "wedding_id")?;
    let role = row
        .get("role")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    Ok(Some(WeddingMembership { wedding_id, role }))
}

/// Wedding row and the member's profile.
pub async fn core_slice(
    store: &dyn Store,
    wedding_id: &str,
    user_id: &str,
) -> Result<Map<String, Value>, StoreError> {
    let mut out = Map::new();

    let weddings = store
        .execute(
            "SELECT wedding_id, wedding_name, wedding_date, wedding_location, wedding_style, \
             status, details FROM weddings WHERE wedding_id = :wedding_id",
            &params([("wedding_id", json!(wedding_id))]),
        )
        .await?;
    if let Some(mut wedding) = weddings.into_iter().next() {
        // `details` is stored as a JSON document; expose it structured.
        if let Some(Value::String(raw)) = wedding.get("details")
            && let Ok(parsed) = serde_json::from_str::<Value>(raw)
        {
            wedding.insert("details".into(), parsed);
        }
        out.insert("wedding_data".into(), Value::Object(wedding));
    }

    let users = store
        .execute(
            "SELECT display_name, email FROM users WHERE user_id = :user_id",
            &params([("user_id", json!(user_id))]),
        )
        .await?;
    if let Some(user) = users.into_iter().next() {
        if let Some(name) = user.get("display_name").filter(|v| v.is_string()) {
            out.insert("user_display_name".into(), name.clone());
        }
        if let Some(email) = user.get("email").filter(|v| v.is_string()) {
            out.insert("user_email".into(), email.clone());
        }
    }

    Ok(out)
}

/// Active workflows and open tasks.
pub async fn tasks_slice(
    store: &dyn Store,
    wedding_id: &str,
) -> Result<Map<String, Value>, StoreError> {
    let by_wedding = params([("wedding_id", json!(wedding_id)), ("done", json!(false))]);

    let workflows = store
        .execute(
            &format!(
                "SELECT workflow_id, workflow_name, status, context_summary FROM workflows \
                 WHERE wedding_id = :wedding_id AND status IN ({ACTIVE_WORKFLOW_STATES}) \
                 ORDER BY updated_at DESC"
            ),
            &by_wedding,
        )
        .await?;

    let tasks = store
        .execute(
            "SELECT task_id, title, description, status, priority, category, lead_party, \
             due_date FROM tasks WHERE wedding_id = :wedding_id AND is_complete = :done \
             ORDER BY due_date IS NULL, due_date, updated_at DESC",
            &by_wedding,
        )
        .await?;

    let mut out = Map::new();
    out.insert("active_workflows".into(), rows_value(workflows));
    out.insert("relevant_tasks".into(), rows_value(tasks));
    Ok(out)
}

/// Dated view of the plan relative to `today`: events in the next 30 days,
/// overdue open tasks, open tasks due within 30 days (urgent) and the
/// nearest deadlines within 14 days.
pub async fn timeline_slice(
    store: &dyn Store,
    wedding_id: &str,
    today: NaiveDate,
) -> Result<Map<String, Value>, StoreError> {
    let window = params([
        ("wedding_id", json!(wedding_id)),
        ("done", json!(false)),
        ("today", json!(today.to_string())),
        ("next_14", json!((today + Days::new(14)).to_string())),
        ("next_30", json!((today + Days::new(30)).to_string())),
    ]);

    let events = store
        .execute(
            "SELECT event_id, event_name, event_date_time, location FROM timeline_events \
             WHERE wedding_id = :wedding_id \
             AND date(event_date_time) BETWEEN :today AND :next_30 \
             ORDER BY event_date_time LIMIT 10",
            &window,
        )
        .await?;
    let overdue = store
        .execute(
            &format!(
                "SELECT {OPEN_TASK_COLUMNS} FROM tasks \
                 WHERE wedding_id = :wedding_id AND is_complete = :done AND due_date < :today \
                 ORDER BY due_date LIMIT 10"
            ),
            &window,
        )
        .await?;
    let urgent = store
        .execute(
            &format!(
                "SELECT {OPEN_TASK_COLUMNS} FROM tasks \
                 WHERE wedding_id = :wedding_id AND is_complete = :done \
                 AND due_date BETWEEN :today AND :next_30 \
                 ORDER BY due_date LIMIT 10"
            ),
            &window,
        )
        .await?;
    let deadlines = store
        .execute(
            "SELECT task_id, title, due_date, priority, category FROM tasks \
             WHERE wedding_id = :wedding_id AND is_complete = :done AND due_date <= :next_14 \
             ORDER BY due_date LIMIT 5",
            &window,
        )
        .await?;

    let mut out = Map::new();
    out.insert(
        "timeline_summary".into(),
        json!({
            "upcoming_count": events.len(),
            "overdue_count": overdue.len(),
            "urgent_count": urgent.len(),
        }),
    );
    out.insert("upcoming_events".into(), rows_value(events));
    out.insert("overdue_tasks".into(), rows_value(overdue));
    out.insert("urgent_tasks".into(), rows_value(urgent));
    out.insert("upcoming_deadlines".into(), rows_value(deadlines));
    Ok(out)
}

/// Budget totals and a per-category breakdown.
pub async fn budget_slice(
    store: &dyn Store,
    wedding_id: &str,
) -> Result<Map<String, Value>, StoreError> {
    let by_wedding = params([("wedding_id", json!(wedding_id))]);

    let totals = store
        .execute(
            "SELECT COALESCE(SUM(amount), 0.0) AS total, \
             COALESCE(SUM(CASE WHEN status = 'Paid' THEN amount ELSE 0.0 END), 0.0) AS paid, \
             COALESCE(SUM(CASE WHEN status = 'Pending' THEN amount ELSE 0.0 END), 0.0) AS pending, \
             COUNT(*) AS items \
             FROM budget_items WHERE wedding_id = :wedding_id",
            &by_wedding,
        )
        .await?;

    let summary = store
        .execute(
            "SELECT category, SUM(amount) AS amount, COUNT(*) AS items FROM budget_items \
             WHERE wedding_id = :wedding_id GROUP BY category ORDER BY amount DESC",
            &by_wedding,
        )
        .await?;

    let mut out = Map::new();
    if let Some(row) = totals.into_iter().next() {
        out.insert("budget_totals".into(), Value::Object(row));
    }
    out.insert("budget_summary".into(), rows_value(summary));
    Ok(out)
}

/// Vendors the couple has shortlisted.
pub async fn vendors_slice(
    store: &dyn Store,
    wedding_id: &str,
) -> Result<Map<String, Value>, StoreError> {
    let vendors = store
        .execute(
            "SELECT vendor_name, vendor_category, status, estimated_cost \
             FROM user_shortlisted_vendors WHERE wedding_id = :wedding_id \
             ORDER BY created_at DESC",
            &params([("wedding_id", json!(wedding_id))]),
        )
        .await?;

    let mut out = Map::new();
    out.insert("shortlisted_vendors".into(), rows_value(vendors));
    Ok(out)
}

/// Items waiting on the user: reviews led by their side of the family (or
/// the couple) and workflows awaiting feedback.
pub async fn pending_actions_slice(
    store: &dyn Store,
    wedding_id: &str,
    role: &str,
) -> Result<Map<String, Value>, StoreError> {
    let by_party = params([
        ("wedding_id", json!(wedding_id)),
        ("user_party", json!(user_party(role))),
    ]);

    let reviews = store
        .execute(
            &format!(
                "SELECT task_id, title, status, lead_party FROM tasks \
                 WHERE wedding_id = :wedding_id AND status IN ({REVIEW_STATES}) \
                 AND lead_party IN (:user_party, 'couple') \
                 ORDER BY due_date IS NULL, due_date LIMIT 10"
            ),
            &by_party,
        )
        .await?;
    let awaiting = store
        .execute(
            "SELECT workflow_id, workflow_name FROM workflows \
             WHERE wedding_id = :wedding_id AND status = 'awaiting_feedback' LIMIT 10",
            &by_party,
        )
        .await?;

    let mut out = Map::new();
    out.insert(
        "pending_actions".into(),
        json!({
            "pending_reviews": rows_value(reviews),
            "awaiting_workflows": rows_value(awaiting),
        }),
    );
    Ok(out)
}

/// The `lead_party` value that belongs to a member role.
fn user_party(role: &str) -> String {
    match role {
        "bride" | "groom" => format!("{role}_side"),
        "" => "member".to_string(),
        other => other.to_string(),
    }
}

fn rows_value(rows: Vec<Row>) -> Value {
    Value::Array(rows.into_iter().map(Value::Object).collect())
}

fn string_field(row: &Row, key: &str) -> Result<String, StoreError> {
    row.get(key)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| StoreError::Decode(format!("row has no string column {key}")))
}
