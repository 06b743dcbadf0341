pub(crate) mod api_tokens;
pub(crate) mod initialize;
mod migration;
pub(crate) mod token_ops;
pub(crate) mod user_ops;
pub(crate) mod users;
