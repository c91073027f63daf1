//! # WebShield Core
//!
//! Core library for the WebShield Scanner: runs external security scanners
//! (nmap, nikto, wapiti, ffuf) as supervised child processes and keeps their
//! output available for incremental polling.
//!
//! ## Overview
//!
//! - [`scan::validate_target`] gates user-supplied targets
//! - [`scan::CommandBuilder`] maps a scan request onto a tool command line
//! - [`scan::JobRegistry`] holds job state and accumulated output
//! - [`scan::ProcessSupervisor`] spawns, streams, reaps and stops scanners
//! - [`scan::JobController`] composes the above behind start, poll and stop
//! - [`report`] renders downloadable txt, html and pdf reports
//! - [`tools`] probes which scanner binaries are installed
//!
//! ## Examples
//!
//! ```no_run
//! use webshield_core::scan::{JobController, ScannerSettings};
//!
//! # async fn run() -> webshield_core::Result<()> {
//! let controller = JobController::new(ScannerSettings::default());
//! let started = controller.start("portscan", "example.com", "open_ports")?;
//! let tail = controller.poll(&started.id, 0)?;
//! println!("{}: {} lines", tail.status, tail.total);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod report;
pub mod scan;
pub mod tools;

pub use error::{Result, ScanError};
