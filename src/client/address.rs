//! `host[:port]` parsing for the command line.
//!
//! Accepted forms: `host`, `host:port`, `[v6literal]:port`, `[v6literal]`.
//! A bare IPv6 literal (multiple colons, no brackets) is taken as host-only.

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl HostPort {
    pub fn parse(input: &str, default_port: u16) -> Result<Self, ConfigError> {
        let bad = || ConfigError::BadHostPort(input.to_owned());
        if input.is_empty() {
            return Err(bad());
        }

        // Bracketed literal, with or without a port.
        if let Some(rest) = input.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(bad)?;
            if host.is_empty() {
                return Err(bad());
            }
            let port = match tail {
                "" => default_port,
                _ => tail
                    .strip_prefix(':')
                    .and_then(|p| p.parse().ok())
                    .ok_or_else(bad)?,
            };
            return Ok(Self {
                host: host.to_owned(),
                port,
            });
        }

        match input.match_indices(':').count() {
            0 => Ok(Self {
                host: input.to_owned(),
                port: default_port,
            }),
            1 => {
                let (host, port) = input.split_once(':').ok_or_else(bad)?;
                if host.is_empty() {
                    return Err(bad());
                }
                Ok(Self {
                    host: host.to_owned(),
                    port: port.parse().map_err(|_| bad())?,
                })
            }
            // Un-bracketed IPv6 literal: the whole string is the host.
            _ => Ok(Self {
                host: input.to_owned(),
                port: default_port,
            }),
        }
    }
}
