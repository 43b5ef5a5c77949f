pub(crate) mod placeholder;
pub(crate) mod resolver;
