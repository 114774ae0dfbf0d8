//! Tax computations

pub mod gst;

pub use gst::*;
