//! ucgrep — a parallel recursive source-code grep.
//!
//! Given a pattern and one or more start paths, finds every matching line
//! in every recognized source file beneath them. Three pipeline stages run
//! concurrently on OS threads: a parallel directory walker feeding a file
//! queue, a pool of scanners running the compiled pattern over whole-file
//! buffers, and a single output task rendering match groups in arrival
//! order.

#[macro_use]
extern crate derive_builder;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

pub mod cli;
pub mod config;
pub mod dirfilter;
pub mod error;
pub mod filter;
pub mod matcher;
pub mod matchlist;
pub mod output;
pub mod queue;
pub mod rcfile;
pub mod run;
pub mod scanner;
pub mod types;
pub mod walker;

pub use crate::run::run;
