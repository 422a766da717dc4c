use std::fmt;
use std::fs;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use tracing::debug;

use crate::error::CiteError;

pub const CREDENTIAL_SERVICE: &str = "cera";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    login: String,
    password: String,
}

impl Credentials {
    pub fn new(login: &str, password: &str) -> Self {
        Self {
            login: login.to_string(),
            password: password.to_string(),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub trait CredentialResolver {
    fn resolve(&self, service: &str) -> Result<Credentials, CiteError>;
}

/// Reads `machine` entries from a netrc file.
#[derive(Debug, Clone)]
pub struct NetrcResolver {
    path: Utf8PathBuf,
}

impl NetrcResolver {
    /// `$NETRC`, else `~/.netrc`.
    pub fn new() -> Result<Self, CiteError> {
        if let Ok(path) = std::env::var("NETRC") {
            if !path.trim().is_empty() {
                return Ok(Self::with_path(Utf8PathBuf::from(path.trim())));
            }
        }
        let path = BaseDirs::new()
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.home_dir().join(".netrc")).ok())
            .ok_or_else(|| CiteError::CredentialRead {
                path: "~/.netrc".to_string(),
                message: "unable to resolve home directory".to_string(),
            })?;
        Ok(Self::with_path(path))
    }

    pub fn with_path(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }
}

impl CredentialResolver for NetrcResolver {
    fn resolve(&self, service: &str) -> Result<Credentials, CiteError> {
        debug!(path = %self.path, service, "credentials.netrc");
        let content =
            fs::read_to_string(self.path.as_std_path()).map_err(|err| CiteError::CredentialRead {
                path: self.path.to_string(),
                message: err.to_string(),
            })?;
        parse_netrc(&content, service).ok_or_else(|| CiteError::MissingCredentials {
            service: service.to_string(),
            path: self.path.to_string(),
        })
    }
}

/// Credentials for `machine`, falling back to a `default` entry.
pub fn parse_netrc(content: &str, machine: &str) -> Option<Credentials> {
    let mut matched = None;
    let mut fallback = None;
    let mut current: Option<Entry> = None;

    let mut lines = content.lines();
    while let Some(line) = lines.next() {
        let mut tokens = line.split_whitespace();
        while let Some(token) = tokens.next() {
            match token {
                "machine" | "default" => {
                    if let Some(entry) = current.take() {
                        entry.store(machine, &mut matched, &mut fallback);
                    }
                    let host = match token {
                        "machine" => tokens.next().map(str::to_string),
                        _ => None,
                    };
                    current = Some(Entry {
                        host,
                        login: None,
                        password: None,
                    });
                }
                "login" => {
                    if let Some(entry) = current.as_mut() {
                        entry.login = tokens.next().map(str::to_string);
                    }
                }
                "password" => {
                    if let Some(entry) = current.as_mut() {
                        entry.password = tokens.next().map(str::to_string);
                    }
                }
                "account" => {
                    tokens.next();
                }
                "macdef" => {
                    // Macro bodies run until the next blank line.
                    for body in lines.by_ref() {
                        if body.trim().is_empty() {
                            break;
                        }
                    }
                    break;
                }
                _ => {}
            }
        }
    }
    if let Some(entry) = current.take() {
        entry.store(machine, &mut matched, &mut fallback);
    }
    matched.or(fallback)
}

struct Entry {
    host: Option<String>,
    login: Option<String>,
    password: Option<String>,
}

impl Entry {
    fn store(
        self,
        machine: &str,
        matched: &mut Option<Credentials>,
        fallback: &mut Option<Credentials>,
    ) {
        let (Some(login), Some(password)) = (self.login, self.password) else {
            return;
        };
        let credentials = Credentials { login, password };
        match self.host.as_deref() {
            Some(host) if host == machine && matched.is_none() => *matched = Some(credentials),
            None if fallback.is_none() => *fallback = Some(credentials),
            _ => {}
        }
    }
}
