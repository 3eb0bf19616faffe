use super::types::WorkerId;

/// Circular order of worker identities, ascending, wrapping from the last
/// identity back to the first.
///
/// A worker pushes its writes to its two successors, so after a (re)join it
/// recovers from its two predecessors: they are the nodes whose writes it
/// would have been receiving.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ring {
    members: Vec<WorkerId>,
}

impl Ring {
    pub fn new(ids: impl IntoIterator<Item = WorkerId>) -> Self {
        let mut members: Vec<WorkerId> = ids.into_iter().collect();
        members.sort();
        members.dedup();
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &WorkerId) -> bool {
        self.members.binary_search(id).is_ok()
    }

    pub fn members(&self) -> &[WorkerId] {
        &self.members
    }

    fn position(&self, id: &WorkerId) -> Option<usize> {
        if self.members.len() <= 1 {
            return None;
        }
        self.members.binary_search(id).ok()
    }

    pub fn successor(&self, id: &WorkerId) -> Option<&WorkerId> {
        let idx = self.position(id)?;
        Some(&self.members[(idx + 1) % self.members.len()])
    }

    pub fn predecessor(&self, id: &WorkerId) -> Option<&WorkerId> {
        let idx = self.position(id)?;
        let len = self.members.len();
        Some(&self.members[(idx + len - 1) % len])
    }

    /// Nodes that receive copies of `id`'s writes: its two successors.
    pub fn replica_targets(&self, id: &WorkerId) -> Vec<WorkerId> {
        self.two_steps(id, Self::successor)
    }

    /// Nodes a (re)joining `id` should pull from, nearest predecessor first.
    pub fn source_candidates(&self, id: &WorkerId) -> Vec<WorkerId> {
        self.two_steps(id, Self::predecessor)
    }

    fn two_steps<'a>(
        &'a self,
        id: &WorkerId,
        step: fn(&'a Self, &WorkerId) -> Option<&'a WorkerId>,
    ) -> Vec<WorkerId> {
        let mut out: Vec<WorkerId> = Vec::with_capacity(2);
        let mut current = id;
        for _ in 0..2 {
            let Some(next) = step(self, current) else {
                break;
            };
            if next != id && !out.contains(next) {
                out.push(next.clone());
            }
            current = next;
        }
        out
    }
}
