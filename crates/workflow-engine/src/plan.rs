//! Plans produced by the per-domain differs.

/// What to do with one entity
#[derive(Debug, Clone, PartialEq)]
pub enum PlanItem<T> {
    /// Entity is missing on the Controller
    Create(T),
    /// Entity exists as `id` and differs; `patch` is the full desired record
    Update { id: String, patch: T },
    /// Entity already matches
    NoOp(String),
    /// Entity `id` must be removed
    Delete(String),
}

impl<T> PlanItem<T> {
    /// Whether the item needs a write
    pub fn is_mutation(&self) -> bool {
        !matches!(self, PlanItem::NoOp(_))
    }
}

/// Ordered plan keyed by a domain label
///
/// Iteration helpers yield creates, updates and deletes separately so the
/// executor can apply them in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan<K, T> {
    entries: Vec<(K, PlanItem<T>)>,
}

impl<K, T> Default for Plan<K, T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<K, T> Plan<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: K, item: PlanItem<T>) {
        self.entries.push((key, item));
    }

    /// True when nothing needs to be written
    pub fn is_empty(&self) -> bool {
        !self.entries.iter().any(|(_, item)| item.is_mutation())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[(K, PlanItem<T>)] {
        &self.entries
    }

    pub fn creates(&self) -> impl Iterator<Item = (&K, &T)> {
        self.entries.iter().filter_map(|(k, item)| match item {
            PlanItem::Create(t) => Some((k, t)),
            _ => None,
        })
    }

    pub fn updates(&self) -> impl Iterator<Item = (&K, &str, &T)> {
        self.entries.iter().filter_map(|(k, item)| match item {
            PlanItem::Update { id, patch } => Some((k, id.as_str(), patch)),
            _ => None,
        })
    }

    pub fn deletes(&self) -> impl Iterator<Item = (&K, &str)> {
        self.entries.iter().filter_map(|(k, item)| match item {
            PlanItem::Delete(id) => Some((k, id.as_str())),
            _ => None,
        })
    }

    pub fn noops(&self) -> impl Iterator<Item = (&K, &str)> {
        self.entries.iter().filter_map(|(k, item)| match item {
            PlanItem::NoOp(reason) => Some((k, reason.as_str())),
            _ => None,
        })
    }

    /// Keys of every item that still needs a write
    pub fn pending_keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().filter(|(_, item)| item.is_mutation()).map(|(k, _)| k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_partitions_by_kind() {
        let mut plan: Plan<&str, u32> = Plan::new();
        plan.push("a", PlanItem::Delete("id-a".into()));
        plan.push("b", PlanItem::Create(2));
        plan.push("c", PlanItem::NoOp("already up to date".into()));
        plan.push("d", PlanItem::Update { id: "id-d".into(), patch: 4 });

        assert!(!plan.is_empty());
        assert_eq!(plan.creates().map(|(k, _)| *k).collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(plan.updates().map(|(_, id, _)| id).collect::<Vec<_>>(), vec!["id-d"]);
        assert_eq!(plan.deletes().map(|(_, id)| id).collect::<Vec<_>>(), vec!["id-a"]);
        assert_eq!(plan.pending_keys().count(), 3);
    }

    #[test]
    fn test_noop_only_plan_is_empty() {
        let mut plan: Plan<&str, u32> = Plan::new();
        plan.push("a", PlanItem::NoOp("same".into()));
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 1);
    }
}
