//! suitediff - compare two LLVM builds through the LLVM test-suite
//!
//! This library provides the pieces behind the `suitediff` binary: a
//! line-level differ for generated assembly and bitcode, a filter that keeps
//! only the test results whose code changed, a merger for repeated result
//! reports, performance comparison tables, and instruction statistics.

pub mod cli;
pub mod compare;
pub mod differ;
pub mod filter;
pub mod instcount;
pub mod merge;
pub mod report;
