//! Computed columns of the token admin.

use serde::Serialize;

use crate::admin::templates::AdminTemplates;
use crate::db::api_tokens;
use crate::error::AppError;

/// Placeholder shown when there is nothing to display.
pub(crate) const EMPTY_VALUE: &str = "-";

const PREVIEW_CHARS: usize = 10;

/// How long the "Token copied!" toast stays on screen.
pub(crate) const TOAST_MILLIS: u32 = 2000;

#[derive(Serialize)]
struct CopyTokenWidget<'a> {
    element_id: String,
    value: &'a str,
    toast_millis: u32,
}

/// First ten characters of the token followed by `...`, or `-` when the token
/// has not been generated yet.
pub(crate) fn short_token(token: &api_tokens::Model) -> String {
    match token.token_value() {
        Some(value) => {
            let head: String = value.chars().take(PREVIEW_CHARS).collect();
            format!("{head}...")
        }
        None => EMPTY_VALUE.to_string(),
    }
}

/// Read-only input holding the full token plus a copy button.
///
/// The toast is shown whether or not the browser actually copied anything.
pub(crate) fn copy_token_button(
    templates: &AdminTemplates,
    token: &api_tokens::Model,
) -> Result<String, AppError> {
    let Some(value) = token.token_value() else {
        return Ok(EMPTY_VALUE.to_string());
    };
    templates.render(
        "admin/copy_token.html",
        &CopyTokenWidget {
            element_id: format!("token-{}", token.id),
            value,
            toast_millis: TOAST_MILLIS,
        },
    )
}
