//! Seedsift - Mini-SEED data selection.
//!
//! This crate selects, time-orders and prunes seismic time-series data
//! stored as Mini-SEED records.
//!
//! # Components
//!
//! - [`Session`]: a selection pass — read, prune, write
//! - [`TraceGroup`](select::TraceGroup) / [`RecordMap`](select::RecordMap):
//!   per-channel index of physical records, built without unpacking samples
//! - [`mseed`]: the Mini-SEED codec (headers, payloads, sequential reading)
//! - [`Archive`](archive::Archive): path-template output routing
//! - [`pod`]: request-file driven pruning over a POD directory structure
//!
//! # Example
//!
//! ```rust,ignore
//! use seedsift::{PruneMode, SelectConfig, Session};
//!
//! // Deduplicate overlapping records across two files.
//! let config = SelectConfig::default()
//!     .with_prune(PruneMode::Record)
//!     .with_output_file("clean.mseed");
//!
//! let mut session = Session::new(config);
//! session.add_file("day1.mseed");
//! session.add_file("day2.mseed");
//! session.read_files()?;
//! session.process()?;
//! ```

#![deny(missing_docs)]

pub mod archive;
pub mod config;
pub mod error;
pub mod hpt;
pub mod limits;
pub mod mseed;
pub mod pod;
pub mod select;

pub use config::{PruneMode, SelectConfig, SplitBoundary};
pub use error::{Result, SiftError};
pub use hpt::{Hpt, Quality, HPT_MODULUS};
pub use mseed::ChannelId;
pub use select::{ReadSummary, Session, WriteSummary};
