//! Declarative field bindings.
//!
//! Binding directives are config-sourced strings relating a local field to a
//! peer's field:
//!
//! ```text
//! binding  := field (" -> " | " <- ") peer "." field
//! ```
//!
//! `->` is a **push** (every local write is forwarded to the peer), `<-` a
//! **pull** (every local read is answered by the peer). Whitespace around
//! the arrow is tolerated; strings not matching the grammar are skipped.

use std::fmt;

/// A parsed binding directive, not yet resolved to an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingSpec {
    /// `local -> peer.field`: writes to `local` are forwarded to the peer.
    Push {
        /// Local field name.
        local: String,
        /// Peer workload name.
        peer: String,
        /// Field on the peer.
        field: String,
    },
    /// `local <- peer.field`: reads of `local` are answered by the peer.
    Pull {
        /// Local field name.
        local: String,
        /// Peer workload name.
        peer: String,
        /// Field on the peer.
        field: String,
    },
}

impl BindingSpec {
    /// Parse one directive. Returns `None` for anything not matching the
    /// grammar; the permissive parse skips such strings.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let (local, rest, push) = if let Some((local, rest)) = input.split_once("->") {
            (local, rest, true)
        } else if let Some((local, rest)) = input.split_once("<-") {
            (local, rest, false)
        } else {
            return None;
        };

        let local = local.trim();
        let (peer, field) = rest.trim().split_once('.')?;
        let (peer, field) = (peer.trim(), field.trim());
        if local.is_empty() || peer.is_empty() || field.is_empty() {
            return None;
        }

        let (local, peer, field) = (local.to_string(), peer.to_string(), field.to_string());
        Some(if push {
            BindingSpec::Push { local, peer, field }
        } else {
            BindingSpec::Pull { local, peer, field }
        })
    }

    /// The local field the directive applies to.
    #[must_use]
    pub fn local(&self) -> &str {
        match self {
            BindingSpec::Push { local, .. } | BindingSpec::Pull { local, .. } => local,
        }
    }

    /// The referenced peer workload name.
    #[must_use]
    pub fn peer(&self) -> &str {
        match self {
            BindingSpec::Push { peer, .. } | BindingSpec::Pull { peer, .. } => peer,
        }
    }

    /// The referenced field on the peer.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            BindingSpec::Push { field, .. } | BindingSpec::Pull { field, .. } => field,
        }
    }
}

impl fmt::Display for BindingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingSpec::Push { local, peer, field } => {
                write!(f, "{local} -> {peer}.{field}")
            }
            BindingSpec::Pull { local, peer, field } => {
                write!(f, "{local} <- {peer}.{field}")
            }
        }
    }
}
