use crate::api::types::Group;
use std::collections::HashSet;

/// Identity of a group row. Sender and domain keys live in separate spaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Sender(String),
    Domain(String),
}

impl GroupKey {
    pub fn of(group: &Group) -> Self {
        match group {
            Group::Sender { email, .. } => GroupKey::Sender(email.clone()),
            Group::Domain { domain, .. } => GroupKey::Domain(domain.clone()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GroupKey::Sender(_) => "sender",
            GroupKey::Domain(_) => "domain",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            GroupKey::Sender(v) | GroupKey::Domain(v) => v,
        }
    }

    pub fn parse(kind: &str, value: &str) -> Option<Self> {
        match kind {
            "sender" => Some(GroupKey::Sender(value.to_string())),
            "domain" => Some(GroupKey::Domain(value.to_string())),
            _ => None,
        }
    }
}

/// Groups whose member emails are shown. Survives refetches, sort changes and paging.
#[derive(Debug, Default, Clone)]
pub struct ExpansionSet {
    expanded: HashSet<GroupKey>,
}

impl ExpansionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `key`. Returns the new state.
    pub fn toggle(&mut self, key: &GroupKey) -> bool {
        if self.expanded.remove(key) {
            false
        } else {
            self.expanded.insert(key.clone());
            true
        }
    }

    pub fn is_expanded(&self, key: &GroupKey) -> bool {
        self.expanded.contains(key)
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_is_its_own_inverse() {
        let mut set = ExpansionSet::new();
        let key = GroupKey::Domain("example.com".to_string());

        assert!(set.toggle(&key));
        assert!(set.is_expanded(&key));
        assert!(!set.toggle(&key));
        assert!(!set.is_expanded(&key));
        assert!(set.is_empty());
    }

    #[test]
    fn test_key_spaces_are_separate() {
        let mut set = ExpansionSet::new();
        set.toggle(&GroupKey::Sender("same".to_string()));
        assert!(!set.is_expanded(&GroupKey::Domain("same".to_string())));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_key_from_group() {
        let group = Group::Sender {
            name: Some("Ann".to_string()),
            email: "ann@a.com".to_string(),
            count: 1,
            latest_date: None,
            emails: Vec::new(),
        };
        assert_eq!(GroupKey::of(&group), GroupKey::Sender("ann@a.com".to_string()));
        assert_eq!(GroupKey::parse("domain", "a.com"), Some(GroupKey::Domain("a.com".to_string())));
        assert_eq!(GroupKey::parse("thread", "x"), None);
    }
}
