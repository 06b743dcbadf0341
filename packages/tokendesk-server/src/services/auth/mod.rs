pub(crate) mod api_token;
pub(crate) mod staff;
