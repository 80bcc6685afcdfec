//! Core availability checking logic for package names on PyPI.

use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{Config, Index};
use crate::transport::{HttpTransport, Transport, TransportError};

/// Why a package name was rejected before any request was made.
///
/// The [`Display`](fmt::Display) output is the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidPackageName {
    /// A character outside ASCII letters, digits, `.`, `-` and `_`.
    Char,
    /// The name starts or ends with `.`, `-` or `_`.
    StartEnd,
}

impl fmt::Display for InvalidPackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char => write!(
                f,
                "Package name can only contain letters, numbers, hyphens, underscores, and periods"
            ),
            Self::StartEnd => {
                write!(f, "Package name must start and end with a letter or number")
            }
        }
    }
}

impl std::error::Error for InvalidPackageName {}

fn is_separator(ch: char) -> bool {
    matches!(ch, '.' | '-' | '_')
}

/// Validate a package name against the PEP 508 naming rules.
///
/// The empty string is accepted: an empty field is an idle condition for
/// the caller to handle, not a validation failure. The character set is
/// checked before the start/end rule.
///
/// ```
/// use pypi_avail::check::{InvalidPackageName, validate_package_name};
///
/// assert!(validate_package_name("friendly.bard").is_ok());
/// assert_eq!(validate_package_name("my package"), Err(InvalidPackageName::Char));
/// assert_eq!(validate_package_name("-foo"), Err(InvalidPackageName::StartEnd));
/// ```
pub fn validate_package_name(name: &str) -> Result<(), InvalidPackageName> {
    if name.is_empty() {
        return Ok(());
    }

    if !name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || is_separator(ch))
    {
        return Err(InvalidPackageName::Char);
    }

    let starts_ok = name.starts_with(|ch: char| ch.is_ascii_alphanumeric());
    let ends_ok = name.ends_with(|ch: char| ch.is_ascii_alphanumeric());
    if !(starts_ok && ends_ok) {
        return Err(InvalidPackageName::StartEnd);
    }

    Ok(())
}

/// Canonicalize a package name per PEP 503: lowercase, and collapse every
/// run of `.`, `-` and `_` into a single `-`.
///
/// PyPI treats `My_Package`, `my.package` and `my-package` as one project.
///
/// ```
/// use pypi_avail::check::canon_package_name;
/// assert_eq!(canon_package_name("FrIeNdLy-._.-bArD"), "friendly-bard");
/// ```
#[must_use]
pub fn canon_package_name(name: &str) -> String {
    let mut canonical = String::with_capacity(name.len());
    let mut in_run = false;
    for ch in name.chars() {
        if is_separator(ch) {
            if !in_run {
                canonical.push('-');
                in_run = true;
            }
        } else {
            canonical.extend(ch.to_lowercase());
            in_run = false;
        }
    }
    canonical
}

/// A lookup failure the user can recover from by trying again.
///
/// The [`Display`](fmt::Display) output is the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Failure {
    /// The index answered 429.
    RateLimited,
    /// The index answered with a 5xx status.
    Unavailable,
    /// Any other status, or the request never completed.
    Other,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "Too many requests, please wait and try again"),
            Self::Unavailable => {
                write!(f, "PyPI is temporarily unavailable, please try again later")
            }
            Self::Other => write!(f, "Something went wrong, please try again"),
        }
    }
}

/// The classified outcome of one index lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[must_use]
pub enum Lookup {
    /// A project is already registered under this name.
    Taken {
        /// Canonical name that was queried.
        name: String,
        /// Page of the existing project.
        project_url: String,
    },
    /// No project is registered under this name.
    Available {
        /// Canonical name that was queried.
        name: String,
    },
    /// The index could not give an answer.
    Failed(Failure),
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Taken { .. } => write!(f, "taken"),
            Self::Available { .. } => write!(f, "available"),
            Self::Failed(failure) => write!(f, "error: {failure}"),
        }
    }
}

/// The lookup was abandoned because its cancellation token fired.
///
/// Kept apart from [`Failure`]: a cancelled lookup has no result to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("lookup cancelled")]
pub struct Cancelled;

/// Errors from the one-shot [`check_name`].
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// Nothing to check after trimming whitespace.
    #[error("package name cannot be empty")]
    Empty,
    /// The name failed validation; no request was made.
    #[error(transparent)]
    InvalidName(#[from] InvalidPackageName),
    /// The lookup was cancelled before it settled.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// A client for one package index.
///
/// Generic over the [`Transport`] so the network can be replaced in tests.
///
/// # Example
///
/// ```no_run
/// use pypi_avail::check::Client;
///
/// let client = Client::new().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Client<T = HttpTransport> {
    transport: T,
    index: Index,
}

impl Client {
    /// Create a client for pypi.org with default timeout settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, TransportError> {
        Self::from_config(&Config::default())
    }

    /// Create a client using the timeout and index from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        Ok(Self {
            transport: HttpTransport::new(config.timeout)?,
            index: config.index.clone(),
        })
    }
}

impl<T: Transport> Client<T> {
    /// Create a client for pypi.org that sends requests through `transport`.
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            index: Index::default(),
        }
    }

    /// Point the client at a different index.
    #[must_use]
    pub fn with_index(mut self, index: Index) -> Self {
        self.index = index;
        self
    }

    /// The index this client queries.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Look up a canonical package name.
    ///
    /// Issues exactly one request unless `cancel` has already fired. When
    /// `cancel` fires first the transport future is dropped, which abandons
    /// the request.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if `cancel` fires before the request settles.
    /// Every other outcome, including transport failures, is a [`Lookup`].
    pub async fn lookup(&self, name: &str, cancel: &CancellationToken) -> Result<Lookup, Cancelled> {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }

        let url = self.index.lookup_url(name);
        debug!(%url, "querying index");
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Cancelled),
            response = self.transport.get(&url) => response,
        };

        Ok(self.classify(name, response))
    }

    /// Map a response status (or transport failure) to a [`Lookup`].
    pub fn classify(&self, name: &str, response: Result<u16, TransportError>) -> Lookup {
        match response {
            Ok(200) => Lookup::Taken {
                name: name.to_owned(),
                project_url: self.index.project_url(name),
            },
            Ok(404) => Lookup::Available {
                name: name.to_owned(),
            },
            Ok(429) => Lookup::Failed(Failure::RateLimited),
            Ok(500..=599) => Lookup::Failed(Failure::Unavailable),
            Ok(status) => {
                debug!(status, %name, "unexpected status from index");
                Lookup::Failed(Failure::Other)
            }
            Err(e) => {
                warn!(error = %e, %name, "index request failed");
                Lookup::Failed(Failure::Other)
            }
        }
    }
}

/// Check whether a package name is available on the client's index.
///
/// Trims the input, validates it, canonicalizes it, and performs a single
/// lookup that nothing else can cancel.
///
/// # Errors
///
/// Returns [`CheckError::Empty`] for blank input and
/// [`CheckError::InvalidName`] if validation fails; neither makes a request.
///
/// # Example
///
/// ```no_run
/// use pypi_avail::check::{Client, Lookup, check_name};
///
/// # async fn example() -> Result<(), pypi_avail::transport::TransportError> {
/// let client = Client::new()?;
/// match check_name(&client, "My_Package").await {
///     Ok(Lookup::Available { name }) => println!("{name} is free"),
///     Ok(other) => println!("{other}"),
///     Err(e) => eprintln!("error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
pub async fn check_name<T: Transport>(client: &Client<T>, name: &str) -> Result<Lookup, CheckError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CheckError::Empty);
    }

    validate_package_name(name)?;
    let canonical = canon_package_name(name);
    let cancel = CancellationToken::new();
    Ok(client.lookup(&canonical, &cancel).await?)
}
