//! System-instruction templating from session state.

use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex is valid")
});

/// Built-in instruction. Every placeholder has a safe default in the primed
/// session state.
pub const DEFAULT_INSTRUCTION: &str = "\
You are Sanskara, a warm and practical wedding-planning assistant speaking \
with {user_display_name} ({current_user_role}) about wedding {current_wedding_id}.

Wedding details: {wedding_data}
Active workflows: {active_workflows}
Relevant tasks: {relevant_tasks}
Urgent tasks: {urgent_tasks}
Overdue tasks: {overdue_tasks}
Upcoming deadlines: {upcoming_deadlines}
Upcoming events: {upcoming_events}
Timeline summary: {timeline_summary}
Budget totals: {budget_totals}
Shortlisted vendors: {shortlisted_vendors}
Pending actions: {pending_actions}
Recent artifacts: {recent_artifacts}

Keep answers short and conversational. Ask before committing to bookings or \
spending, and refer to uploaded files by name when the user mentions them.";

/// Replace `{key}` placeholders with values from `state`.
///
/// Strings are inserted verbatim and other values as compact JSON. Unknown
/// keys are left untouched.
pub fn render_instruction(template: &str, state: &Map<String, Value>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| match state.get(&caps[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Load a template file, or the built-in one when no path is configured.
pub fn load_template(path: Option<&Path>) -> std::io::Result<String> {
    path.map_or_else(|| Ok(DEFAULT_INSTRUCTION.to_string()), std::fs::read_to_string)
}
