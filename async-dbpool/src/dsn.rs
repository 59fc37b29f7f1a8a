//! Connection target descriptors.
//!
//! A descriptor has the form
//! `[user[:password]@][net[(addr)]]/dbname[?param1=value1&paramN=valueN]`,
//! for example `root@tcp(localhost:3306)/inventory`.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

const DEFAULT_NET: &str = "tcp";
const DEFAULT_TCP_ADDR: &str = "127.0.0.1:3306";
const DEFAULT_TCP_PORT: u16 = 3306;
const DEFAULT_UNIX_ADDR: &str = "/tmp/mysql.sock";

/// An error parsing a connection target descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DsnError {
    #[error("invalid DSN: missing the slash separating the database name")]
    MissingSlash,
    #[error("invalid DSN: network address not terminated (missing closing brace)")]
    InvalidAddress,
    #[error("invalid DSN: did you forget to escape a param value?")]
    UnescapedAddress,
    #[error("invalid DSN parameter: {0}")]
    InvalidParam(String),
}

/// A parsed connection target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dsn {
    user: Option<String>,
    password: Option<String>,
    net: String,
    addr: String,
    dbname: String,
    params: BTreeMap<String, String>,
}

impl Dsn {
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// The network type, `tcp` unless specified.
    pub fn net(&self) -> &str {
        &self.net
    }

    /// The network address, defaulted according to the network type.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn dbname(&self) -> &str {
        &self.dbname
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn normalize(&mut self) {
        if self.net.is_empty() {
            self.net = DEFAULT_NET.to_owned();
        }
        if self.addr.is_empty() {
            match self.net.as_str() {
                "tcp" => self.addr = DEFAULT_TCP_ADDR.to_owned(),
                "unix" => self.addr = DEFAULT_UNIX_ADDR.to_owned(),
                _ => (),
            }
        } else if self.net == "tcp" && !has_port(&self.addr) {
            self.addr = format!("{}:{}", self.addr, DEFAULT_TCP_PORT);
        }
    }
}

// Bracketed IPv6 hosts carry colons of their own.
fn has_port(addr: &str) -> bool {
    match addr.rfind(']') {
        Some(close) => addr[close..].contains(':'),
        None => addr.contains(':'),
    }
}

fn parse_params(query: &str) -> Result<BTreeMap<String, String>, DsnError> {
    let mut params = BTreeMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        match pair.find('=') {
            Some(idx) => {
                params.insert(pair[..idx].to_owned(), pair[idx + 1..].to_owned());
            }
            None => return Err(DsnError::InvalidParam(pair.to_owned())),
        }
    }
    Ok(params)
}

impl FromStr for Dsn {
    type Err = DsnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The database name may not contain a slash, so the last one separates
        // the target from the database.
        let slash = s.rfind('/').ok_or(DsnError::MissingSlash)?;
        let (target, rest) = (&s[..slash], &s[slash + 1..]);
        let mut dsn = Dsn::default();

        let location = match target.rfind('@') {
            Some(at) => {
                let userinfo = &target[..at];
                match userinfo.find(':') {
                    Some(colon) => {
                        dsn.user.replace(userinfo[..colon].to_owned());
                        dsn.password.replace(userinfo[colon + 1..].to_owned());
                    }
                    None => {
                        dsn.user.replace(userinfo.to_owned());
                    }
                }
                &target[at + 1..]
            }
            None => target,
        };

        match location.find('(') {
            Some(open) => {
                let inner = &location[open + 1..];
                if !inner.ends_with(')') {
                    return Err(if inner.contains(')') {
                        DsnError::UnescapedAddress
                    } else {
                        DsnError::InvalidAddress
                    });
                }
                dsn.net = location[..open].to_owned();
                dsn.addr = inner[..inner.len() - 1].to_owned();
            }
            None => {
                dsn.net = location.to_owned();
            }
        }

        match rest.find('?') {
            Some(q) => {
                dsn.dbname = rest[..q].to_owned();
                dsn.params = parse_params(&rest[q + 1..])?;
            }
            None => {
                dsn.dbname = rest.to_owned();
            }
        }

        dsn.normalize();
        Ok(dsn)
    }
}

impl Display for Dsn {
    /// Formats the descriptor with any password masked, so it is safe to log.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(user) = self.user.as_ref() {
            write!(f, "{}", user)?;
            if self.password.is_some() {
                write!(f, ":***")?;
            }
            write!(f, "@")?;
        }
        write!(f, "{}({})/{}", self.net, self.addr, self.dbname)?;
        let mut sep = '?';
        for (key, value) in self.params.iter() {
            write!(f, "{}{}={}", sep, key, value)?;
            sep = '&';
        }
        Ok(())
    }
}
