//! Frame storage: nodes, the root, the thread-local register and the
//! process-wide state.

pub(crate) mod frame;
pub(crate) mod global;
pub(crate) mod root;
pub(crate) mod tls;
