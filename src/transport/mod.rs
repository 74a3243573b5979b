//! Transport layer - how users reach the coach

pub mod cli;
