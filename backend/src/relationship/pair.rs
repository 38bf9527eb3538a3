use std::fmt;

use crate::models::UserId;

/// Orders two identifiers so that `(a, b)` and `(b, a)` give the same result.
pub fn canonicalize<'a>(a: &'a UserId, b: &'a UserId) -> (&'a UserId, &'a UserId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Order-independent storage key for a pair of users.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    lo: UserId,
    hi: UserId,
}

impl PairKey {
    pub fn new(a: &UserId, b: &UserId) -> Self {
        let (lo, hi) = canonicalize(a, b);
        Self {
            lo: lo.clone(),
            hi: hi.clone(),
        }
    }

    pub fn lo(&self) -> &UserId {
        &self.lo
    }

    pub fn hi(&self) -> &UserId {
        &self.hi
    }

    pub fn into_parts(self) -> (UserId, UserId) {
        (self.lo, self.hi)
    }

}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.lo, self.hi)
    }
}
