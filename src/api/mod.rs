pub(crate) mod errors;
pub(crate) mod exam;
pub(crate) mod handlers;
pub(crate) mod history;
pub(crate) mod router;
