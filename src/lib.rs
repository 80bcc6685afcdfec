#![warn(missing_docs, missing_debug_implementations)]

//! Check whether Python package names are available on PyPI.
//!
//! Names are validated against the PEP 508 naming rules, canonicalized per
//! PEP 503 (case-insensitive, with runs of `.`, `-` and `_` equivalent), and
//! looked up with a single request to the index's JSON endpoint.
//!
//! [`lookup::LiveLookup`] drives the same pipeline from a changing text
//! field: it debounces edits and cancels lookups made stale by newer input.
//!
//! # Example
//!
//! ```no_run
//! use pypi_avail::check::{Client, Lookup, check_name};
//!
//! # async fn example() -> Result<(), pypi_avail::transport::TransportError> {
//! let client = Client::new()?;
//! match check_name(&client, "my-cool-package").await {
//!     Ok(Lookup::Available { .. }) => println!("Name is available!"),
//!     Ok(Lookup::Taken { project_url, .. }) => println!("Already taken: {project_url}"),
//!     Ok(Lookup::Failed(failure)) => eprintln!("{failure}"),
//!     Err(e) => eprintln!("Error: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod check;
pub mod config;
pub mod lookup;
pub mod preference;
pub mod render;
pub mod transport;
