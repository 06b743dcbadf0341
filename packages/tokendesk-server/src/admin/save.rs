use tracing::warn;

use crate::db::api_tokens::Model as TokenModel;
use crate::db::users::Model as UserModel;
use crate::error::AppError;
use crate::services::tokens::{self, TokenDraft};
use crate::state::AppState;

/// Falls back to the acting admin when the form left the owner empty.
/// Returns whether the owner was filled in.
pub(crate) fn assign_default_owner(draft: &mut TokenDraft, acting: &UserModel) -> bool {
    if draft.user_id.is_some() {
        return false;
    }
    draft.user_id = Some(acting.id);
    true
}

/// Admin save hook: default the owner, then take the normal model save path
/// (which generates the token on creation). Errors are left to the caller.
pub(crate) async fn save_model(
    state: &AppState,
    acting: &UserModel,
    mut draft: TokenDraft,
    existing: Option<TokenModel>,
) -> Result<TokenModel, AppError> {
    let change = existing.is_some();
    if assign_default_owner(&mut draft, acting) {
        warn!(
            admin = %acting.username,
            change,
            "api token saved without owner, assigned to acting admin"
        );
    }
    tokens::save_token(&state.db, &state.config.jwt_secret, draft, existing).await
}
