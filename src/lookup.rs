//! Live lookups driven by a text field that changes on every keystroke.
//!
//! [`LiveLookup`] waits for the input to stay quiet for the configured
//! debounce, validates and canonicalizes it, and queries the index. Each
//! edit retires the cycle started by the previous one: its timer never
//! fires, or its request is cancelled and any late result is discarded.
//! Only the newest cycle can ever write to the observed [`LookupState`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, Serializer};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::check::{Cancelled, Client, Lookup, canon_package_name, validate_package_name};
use crate::config::Config;
use crate::transport::Transport;

/// Where the current input is in its check cycle.
///
/// Each variant carries exactly the data that is meaningful for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing to check.
    #[default]
    Idle,
    /// Waiting for the input to settle.
    Pending,
    /// A request for `name` is in flight.
    Loading {
        /// Canonical name being looked up.
        name: String,
    },
    /// No project is registered under `name`.
    Available {
        /// Canonical name that was looked up.
        name: String,
    },
    /// A project is registered under `name`.
    Taken {
        /// Canonical name that was looked up.
        name: String,
        /// Page of the existing project.
        project_url: String,
    },
    /// The input failed validation; no request was made.
    Invalid {
        /// Why the name was rejected.
        message: String,
    },
    /// The index could not answer.
    Error {
        /// What went wrong, for the user.
        message: String,
    },
}

/// Fieldless mirror of [`Phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    /// See [`Phase::Idle`].
    Idle,
    /// See [`Phase::Pending`].
    Pending,
    /// See [`Phase::Loading`].
    Loading,
    /// See [`Phase::Available`].
    Available,
    /// See [`Phase::Taken`].
    Taken,
    /// See [`Phase::Invalid`].
    Invalid,
    /// See [`Phase::Error`].
    Error,
}

impl Phase {
    /// The variant without its data.
    #[must_use]
    pub fn kind(&self) -> PhaseKind {
        match self {
            Self::Idle => PhaseKind::Idle,
            Self::Pending => PhaseKind::Pending,
            Self::Loading { .. } => PhaseKind::Loading,
            Self::Available { .. } => PhaseKind::Available,
            Self::Taken { .. } => PhaseKind::Taken,
            Self::Invalid { .. } => PhaseKind::Invalid,
            Self::Error { .. } => PhaseKind::Error,
        }
    }

    /// `false` while a timer or request is still outstanding.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending | Self::Loading { .. })
    }
}

impl From<Lookup> for Phase {
    fn from(lookup: Lookup) -> Self {
        match lookup {
            Lookup::Taken { name, project_url } => Self::Taken { name, project_url },
            Lookup::Available { name } => Self::Available { name },
            Lookup::Failed(failure) => Self::Error {
                message: failure.to_string(),
            },
        }
    }
}

/// Snapshot of a [`LiveLookup`], as seen by whatever renders it.
///
/// Serializes to the flat shape `{raw_input, phase, message, resolved_name,
/// result_url}` with empty strings for fields the phase does not use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupState {
    raw_input: String,
    phase: Phase,
}

impl LookupState {
    /// A snapshot of `raw_input` in `phase`.
    pub fn new(raw_input: impl Into<String>, phase: Phase) -> Self {
        Self {
            raw_input: raw_input.into(),
            phase,
        }
    }

    /// Last text the user entered, untrimmed.
    #[must_use]
    pub fn raw_input(&self) -> &str {
        &self.raw_input
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Current phase without its data.
    #[must_use]
    pub fn kind(&self) -> PhaseKind {
        self.phase.kind()
    }

    /// Reason shown for `invalid` and `error`; empty otherwise.
    #[must_use]
    pub fn message(&self) -> &str {
        match &self.phase {
            Phase::Invalid { message } | Phase::Error { message } => message,
            _ => "",
        }
    }

    /// Canonical name behind `loading`, `available` and `taken`; empty otherwise.
    #[must_use]
    pub fn resolved_name(&self) -> &str {
        match &self.phase {
            Phase::Loading { name } | Phase::Available { name } | Phase::Taken { name, .. } => name,
            _ => "",
        }
    }

    /// Project page for `taken`; empty otherwise.
    #[must_use]
    pub fn result_url(&self) -> &str {
        match &self.phase {
            Phase::Taken { project_url, .. } => project_url,
            _ => "",
        }
    }
}

#[derive(Serialize)]
struct StateView<'a> {
    raw_input: &'a str,
    phase: PhaseKind,
    message: &'a str,
    resolved_name: &'a str,
    result_url: &'a str,
}

impl Serialize for LookupState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StateView {
            raw_input: &self.raw_input,
            phase: self.kind(),
            message: self.message(),
            resolved_name: self.resolved_name(),
            result_url: self.result_url(),
        }
        .serialize(serializer)
    }
}

/// Debounced, cancellable availability checks for a changing input.
///
/// Must be created inside a tokio runtime; cycles run as tasks on it.
/// Dropping the `LiveLookup` cancels whatever cycle is outstanding.
///
/// # Example
///
/// ```no_run
/// use pypi_avail::check::Client;
/// use pypi_avail::config::Config;
/// use pypi_avail::lookup::LiveLookup;
///
/// # async fn example() -> Result<(), pypi_avail::transport::TransportError> {
/// let config = Config::default();
/// let mut live = LiveLookup::new(Client::from_config(&config)?, &config);
/// let mut states = live.subscribe();
///
/// live.on_input_change("requests");
/// let settled = states.wait_for(|s| s.phase().is_settled()).await.unwrap().clone();
/// println!("{}", settled.result_url());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LiveLookup<T: Transport> {
    client: Arc<Client<T>>,
    debounce: Duration,
    state: Arc<watch::Sender<LookupState>>,
    current: Option<CancellationToken>,
    runtime: Handle,
}

impl<T: Transport> LiveLookup<T> {
    /// Create an idle lookup using the debounce from `config`.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(client: Client<T>, config: &Config) -> Self {
        let (state, _) = watch::channel(LookupState::default());
        Self {
            client: Arc::new(client),
            debounce: config.debounce,
            state: Arc::new(state),
            current: None,
            runtime: Handle::current(),
        }
    }

    /// Record a new value of the input and restart the check cycle.
    ///
    /// Blank input returns to idle immediately. Anything else becomes
    /// pending and is checked once no further edit arrives within the
    /// debounce.
    pub fn on_input_change(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.retire();

        let query = text.trim().to_owned();
        if query.is_empty() {
            self.state.send_modify(|state| {
                state.raw_input = text;
                state.phase = Phase::Idle;
            });
            return;
        }

        self.state.send_modify(|state| {
            state.raw_input = text;
            state.phase = Phase::Pending;
        });

        let cancel = CancellationToken::new();
        self.current = Some(cancel.clone());
        self.runtime.spawn(run_cycle(
            Arc::clone(&self.client),
            Arc::clone(&self.state),
            cancel,
            query,
            self.debounce,
        ));
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> LookupState {
        self.state.borrow().clone()
    }

    /// Watch every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LookupState> {
        self.state.subscribe()
    }

    /// Cancel the outstanding cycle, if any, and stop accepting input.
    pub fn shutdown(mut self) {
        self.retire();
    }

    fn retire(&mut self) {
        if let Some(cancel) = self.current.take() {
            cancel.cancel();
        }
    }
}

impl<T: Transport> Drop for LiveLookup<T> {
    fn drop(&mut self) {
        self.retire();
    }
}

async fn run_cycle<T: Transport>(
    client: Arc<Client<T>>,
    state: Arc<watch::Sender<LookupState>>,
    cancel: CancellationToken,
    query: String,
    debounce: Duration,
) {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            trace!(%query, "input changed before settling");
            return;
        }
        () = tokio::time::sleep(debounce) => {}
    }

    if let Err(reason) = validate_package_name(&query) {
        debug!(%query, %reason, "rejected package name");
        publish(
            &state,
            &cancel,
            Phase::Invalid {
                message: reason.to_string(),
            },
        );
        return;
    }

    let name = canon_package_name(&query);
    if !publish(&state, &cancel, Phase::Loading { name: name.clone() }) {
        return;
    }

    match client.lookup(&name, &cancel).await {
        Ok(lookup) => {
            if !publish(&state, &cancel, lookup.into()) {
                trace!(%name, "discarded result of superseded lookup");
            }
        }
        Err(Cancelled) => trace!(%name, "lookup cancelled"),
    }
}

/// Write `phase` unless the cycle owning `cancel` has been superseded.
///
/// The token is checked under the channel's write lock, and supersession
/// cancels the token before writing, so a retired cycle never lands a write
/// after its successor's.
fn publish(state: &watch::Sender<LookupState>, cancel: &CancellationToken, phase: Phase) -> bool {
    state.send_if_modified(|current| {
        if cancel.is_cancelled() {
            return false;
        }
        current.phase = phase;
        true
    })
}
