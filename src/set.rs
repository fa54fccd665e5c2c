//! Small dynamic sets of unsigned words
//!
//! Sets are used for multi-valued attributes and as intermediate values on
//! the operand stack. They always have value semantics: cloning produces an
//! independent copy and equality compares members, never identity.

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Set {
    members: Vec<u32>,
}

impl Set {
    pub fn new() -> Self {
        Set {
            members: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Set {
            members: Vec::with_capacity(capacity),
        }
    }

    /// Build a set from a list of members, dropping duplicates
    pub fn from_members(members: &[u32]) -> Self {
        let mut set = Set::with_capacity(members.len());
        for &member in members {
            set.add(member);
        }
        set
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, member: u32) -> bool {
        self.members.contains(&member)
    }

    /// Add a member. Adding a member already present is a no-op.
    pub fn add(&mut self, member: u32) {
        if !self.contains(member) {
            self.members.push(member);
        }
    }

    pub fn remove(&mut self, member: u32) {
        self.members.retain(|&m| m != member);
    }

    /// Get a member by its 1-based index, insertion order
    pub fn member(&self, index: usize) -> Option<u32> {
        if index == 0 {
            return None;
        }
        self.members.get(index - 1).copied()
    }

    pub fn members(&self) -> &[u32] {
        &self.members
    }

    /// Members of both sets, in the order of `self` followed by new members of `other`
    pub fn union(&self, other: &Set) -> Set {
        let mut result = self.clone();
        for &member in &other.members {
            result.add(member);
        }
        result
    }

    /// Two sets are equal if they have the same members, regardless of order
    pub fn same_members(&self, other: &Set) -> bool {
        self.size() == other.size() && self.members.iter().all(|&m| other.contains(m))
    }
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, member) in self.members.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", member)?;
        }
        write!(f, "}}")
    }
}
