//! OSEK/VDX-subset real-time kernel core.
//!
//! Scheduler, event, resource, counter, alarm, schedule-table, and IOC
//! services for a single statically-configured ECU, ported from the
//! `services/os` translation units of the original C baseline. This crate
//! is architecture-agnostic: it is written entirely against the [`Arch`]
//! trait, which `os_port_cm3` implements for real Cortex-M3 hardware. The
//! `host_test` feature swaps in a `spin`-guarded stand-in so the scheduler,
//! alarm, and IOC logic below can run in `#[test]`s on the workstation.

#![cfg_attr(not(feature = "host_test"), no_std)]

pub mod action;
pub mod alarm;
pub mod arch;
pub mod cfg;
pub mod counter;
pub mod error;
pub mod event;
pub mod id;
pub mod ioc;
pub mod kernel;
pub mod klock;
pub mod limits;
mod readyqueue;
pub mod resource;
pub mod schedtbl;
pub mod task;

pub use arch::Arch;
pub use cfg::KernelConfig;
pub use error::{Result, StatusId};
pub use kernel::{DefaultHooks, Hooks, Kernel};

#[cfg(feature = "host_test")]
pub mod host;
