pub(crate) mod reconcile;
pub(crate) mod render_plan;
pub(crate) mod transitions;
