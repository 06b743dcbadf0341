pub(crate) mod admin;
pub(crate) mod api;
pub(crate) mod index;
