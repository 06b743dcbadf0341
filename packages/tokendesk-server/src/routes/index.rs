pub(crate) async fn handler() -> &'static str {
    "tokendesk is running"
}
