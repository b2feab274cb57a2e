//! Folio - live preview engine for Typst documents.
//!
//! [`session::EditingSession`] is the entry point for editor hosts. It
//! drives a [`preview::Orchestrator`] over any [`backend::Backend`]; the
//! bundled [`backend::TypstCli`] shells out to the typst compiler. The
//! `folio` binary in [`cli`] is one such host.

pub mod backend;
pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod fingerprint;
pub mod gate;
pub mod logger;
pub mod position;
pub mod preview;
pub mod session;
