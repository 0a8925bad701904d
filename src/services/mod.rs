pub(crate) mod analytics;
pub(crate) mod evaluation;
pub(crate) mod session_workflow;
