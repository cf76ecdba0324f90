use std::rc::Rc;

/// The hide set of a token is the set of macro names whose expansion
/// resulted in the token. A name in the hide set may never expand that
/// token again, which is what terminates recursive macros.
///
/// Implemented as an immutable singly linked list with `Rc`-shared tails;
/// every token of one expansion shares the same spine. Hide sets are small
/// in practice, so linear scans are fine.
#[derive(Debug, Clone, Default)]
pub struct HideSet {
    head: Option<Rc<Node>>,
}

#[derive(Debug)]
struct Node {
    name: String,
    next: Option<Rc<Node>>,
}

impl HideSet {
    pub fn empty() -> Self {
        Self { head: None }
    }

    pub fn contains(&self, name: &str) -> bool {
        let mut cur = self.head.as_ref();
        while let Some(node) = cur {
            if node.name == name {
                return true;
            }
            cur = node.next.as_ref();
        }
        false
    }

    /// Returns a new set with `name` added; the receiver is unchanged.
    #[must_use]
    pub fn add(&self, name: &str) -> Self {
        if self.contains(name) {
            return self.clone();
        }
        Self {
            head: Some(Rc::new(Node {
                name: name.to_owned(),
                next: self.head.clone(),
            })),
        }
    }

    /// Set of names present in either set.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut ret = other.clone();
        let mut cur = self.head.as_ref();
        while let Some(node) = cur {
            ret = ret.add(&node.name);
            cur = node.next.as_ref();
        }
        ret
    }

    /// Set of names present in both sets.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        let mut ret = Self::empty();
        let mut cur = self.head.as_ref();
        while let Some(node) = cur {
            if other.contains(&node.name) {
                ret = ret.add(&node.name);
            }
            cur = node.next.as_ref();
        }
        ret
    }
}
