#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pypi_avail::transport::{Transport, TransportError};

/// How the stub index answers a request.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Status(u16),
    /// Answer with a status after a delay.
    Delayed(u16, Duration),
    /// Fail as if the connection was refused.
    Refused,
}

#[derive(Debug)]
struct Inner {
    default: Reply,
    routes: HashMap<String, Reply>,
    requests: Vec<String>,
}

/// In-process stand-in for the index that records every request it receives.
#[derive(Debug, Clone)]
pub struct StubIndex {
    inner: Arc<Mutex<Inner>>,
}

impl StubIndex {
    pub fn new(default: Reply) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                default,
                routes: HashMap::new(),
                requests: Vec::new(),
            })),
        }
    }

    /// Answer lookups of the canonical `name` with `reply`.
    pub fn route(self, name: &str, reply: Reply) -> Self {
        self.inner.lock().unwrap().routes.insert(name.to_owned(), reply);
        self
    }

    pub fn set_default(&self, reply: Reply) {
        self.inner.lock().unwrap().default = reply;
    }

    /// URLs requested so far, oldest first.
    pub fn requests(&self) -> Vec<String> {
        self.inner.lock().unwrap().requests.clone()
    }
}

impl Transport for StubIndex {
    fn get(&self, url: &str) -> impl Future<Output = Result<u16, TransportError>> + Send {
        let inner = Arc::clone(&self.inner);
        let url = url.to_owned();
        async move {
            let reply = {
                let mut inner = inner.lock().unwrap();
                inner.requests.push(url.clone());
                inner
                    .routes
                    .iter()
                    .find(|(name, _)| url.ends_with(&format!("/{name}/json")))
                    .map_or(inner.default, |(_, reply)| *reply)
            };
            match reply {
                Reply::Status(status) => Ok(status),
                Reply::Delayed(status, delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(status)
                }
                Reply::Refused => {
                    let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
                    Err(TransportError::Http(Box::new(refused)))
                }
            }
        }
    }
}
