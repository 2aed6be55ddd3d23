//! Contribution tokens
//!
//! A [`Token`] addresses one registered contribution, for example an override
//! inside an [`OverlayableValue`](crate::overlay::OverlayableValue) or a change
//! listener. Tokens are issued from a process-wide counter and never reused.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a registered contribution
///
/// The default token is invalid and never matches an issued one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u64);

impl Token {
    /// The "no token" sentinel
    pub const INVALID: Self = Self(0);

    /// Issue a fresh token
    pub fn create() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Whether this token was issued by [`Token::create`]
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }

    /// Raw identifier
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.0)
    }
}
