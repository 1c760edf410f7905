#![allow(dead_code)]

mod registry;

pub use registry::*;
