pub(crate) mod session_clock;
