//! Host-side pieces of the `mf` binary, exposed as a library so the
//! standard library installation is testable.

pub mod stdlib;
