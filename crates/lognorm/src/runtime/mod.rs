//! Runtime module: process lifecycle for the binary (boot, stdin pipe).

pub mod boot;
pub mod pipe;
