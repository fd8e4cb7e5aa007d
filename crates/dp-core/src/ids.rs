use core::fmt;
use core::num::NonZeroU32;

/// Position of a node or entity inside a `Topology`.
///
/// Stored as index+1 so `Option<Id>` costs nothing extra.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

impl Id {
    /// Indices at `u32::MAX` saturate.
    pub fn from_index(index: u32) -> Self {
        let raw = index.saturating_add(1);
        Self(NonZeroU32::new(raw).unwrap_or(NonZeroU32::MAX))
    }

    pub fn index(self) -> u32 {
        self.0.get() - 1
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

pub type NodeId = Id;
pub type EntityId = Id;
