pub(crate) mod catalog;
pub(crate) mod clock;
pub(crate) mod errors;
pub(crate) mod integrity;
pub(crate) mod paper;
pub(crate) mod result;
pub(crate) mod scoring;
pub(crate) mod session;
