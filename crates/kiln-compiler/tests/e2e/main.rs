//! End-to-end tests for the kiln compiler
//!
//! These tests build modules, lower them and execute the lowered code in
//! the reference interpreter, checking what guest code observes.

mod harness;
mod async_await;
mod classes;
mod closures;
mod exceptions;
mod generators;
mod loops;
mod switch;
