//! Cluster types.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A group of hits, identified by their surrogate keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cluster {
    /// Hit indices belonging to this cluster.
    pub hits: Vec<usize>,
}

impl Cluster {
    /// Returns the number of hits in the cluster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the cluster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Returns an iterator over the hit indices.
    pub fn iter(&self) -> impl Iterator<Item = &usize> {
        self.hits.iter()
    }

    /// First hit index, if any.
    #[must_use]
    pub fn first(&self) -> Option<usize> {
        self.hits.first().copied()
    }
}

impl FromIterator<usize> for Cluster {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            hits: iter.into_iter().collect(),
        }
    }
}

/// How a theta cluster is handled, decided by its size alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ClusterClass {
    /// A single isolated hit.
    Ghost,
    /// More than one hit but too few to be a track.
    False,
    /// Sized like one track: built directly.
    Track,
    /// More hits than layers: several tracks merged in azimuth.
    Clone,
}

impl ClusterClass {
    /// Classifies a cluster of `size` hits on a detector with `layers` planes.
    ///
    /// | size | class |
    /// |---|---|
    /// | 1 | ghost |
    /// | `1 < size <= layers / 2` | false |
    /// | `layers / 2 < size <= layers` | track |
    /// | `size > layers` | clone |
    ///
    /// An empty cluster cannot come out of a clustering pass and is filed
    /// as false.
    #[must_use]
    pub fn classify(size: usize, layers: usize) -> Self {
        let threshold = layers / 2;
        if size == 1 {
            Self::Ghost
        } else if size <= threshold || size == 0 {
            Self::False
        } else if size <= layers {
            Self::Track
        } else {
            Self::Clone
        }
    }
}
