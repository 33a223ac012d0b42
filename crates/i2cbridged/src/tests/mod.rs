//! Test suites for the bridge daemon.

mod launch;
pub(crate) mod support;
