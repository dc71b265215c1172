pub(crate) mod exam_generation;
pub(crate) mod exam_session;
