use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::util::NonCryptographicRng;

macro_rules! num_id {
    ($(#[$meta:meta])* $id:ident, $t:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $id($t);

        impl Deref for $id {
            type Target = $t;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<$t> for $id {
            fn from(v: $t) -> Self {
                $id(v)
            }
        }

        impl fmt::Display for $id {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

num_id!(
    /// Synchronization source identifier of one RTP stream.
    Ssrc,
    u32
);

impl Ssrc {
    /// A uniformly random SSRC.
    ///
    /// No attempt is made to avoid SSRCs already in use in the session.
    pub fn random() -> Self {
        Ssrc(NonCryptographicRng::u32())
    }
}

/// Source of fresh SSRC values for synthesized simulcast layers.
///
/// Implemented for any `FnMut() -> Ssrc`, which lets tests hand in
/// deterministic sequences.
pub trait SsrcGenerator {
    /// Produce the next SSRC.
    fn generate(&mut self) -> Ssrc;
}

impl<F> SsrcGenerator for F
where
    F: FnMut() -> Ssrc,
{
    fn generate(&mut self) -> Ssrc {
        self()
    }
}

/// The default generator. Uniformly random 32-bit values.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSsrc;

impl SsrcGenerator for RandomSsrc {
    fn generate(&mut self) -> Ssrc {
        Ssrc::random()
    }
}
