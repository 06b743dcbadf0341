pub(crate) mod changelist;
pub(crate) mod config;
pub(crate) mod display;
pub(crate) mod forms;
pub(crate) mod save;
pub(crate) mod templates;
pub(crate) mod views;
