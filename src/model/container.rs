// Lazily populated, repetition-indexed store keyed by a slot table

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Hl7Error, Result};
use crate::types::{SlotDeclaration, SlotTable};

/// Outcome of looking up a repetition before materializing it.
#[derive(Debug)]
pub enum Lookup<'a, C> {
    Occupied(&'a C),
    Vacant(VacantRepetition),
}

/// Permission to append the next repetition of one slot.
///
/// Handed out by [`BranchingContainer::lookup`] once sequence and bound
/// checks have passed; consumed by [`BranchingContainer::fill`] on the same
/// container.
#[derive(Debug)]
#[must_use]
pub struct VacantRepetition {
    container: u64,
    slot: usize,
    repetition: usize,
}

impl VacantRepetition {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn repetition(&self) -> usize {
        self.repetition
    }
}

/// Named, ordered, repeatable children described by a [`SlotTable`].
///
/// Children are created on demand, one repetition at a time and only at
/// the end of a slot's sequence, and are never removed. `C` is whatever the
/// owner uses to hold a child; a [`Message`](crate::Message) stores arena
/// handles.
#[derive(Debug)]
pub struct BranchingContainer<C> {
    id: u64,
    table: Arc<SlotTable>,
    children: Vec<Vec<C>>,
}

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(0);

fn next_container_id() -> u64 {
    NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed)
}

// A clone is a separate container; vacancies of the original do not fill it.
impl<C: Clone> Clone for BranchingContainer<C> {
    fn clone(&self) -> Self {
        Self {
            id: next_container_id(),
            table: Arc::clone(&self.table),
            children: self.children.clone(),
        }
    }
}

impl<C> BranchingContainer<C> {
    pub fn new(table: Arc<SlotTable>) -> Self {
        let children = (0..table.len()).map(|_| Vec::new()).collect();
        Self {
            id: next_container_id(),
            table,
            children,
        }
    }

    pub fn table(&self) -> &Arc<SlotTable> {
        &self.table
    }

    pub fn name(&self) -> &str {
        self.table.name()
    }

    pub fn declaration(&self, name: &str) -> Result<&SlotDeclaration> {
        self.table.lookup(name)
    }

    /// Number of repetitions materialized so far; never-accessed slots report 0.
    pub fn count_repetitions(&self, name: &str) -> Result<usize> {
        let slot = self.table.position(name)?;
        Ok(self.children[slot].len())
    }

    /// The materialized repetitions of a slot, in order. May be empty.
    pub fn all_repetitions(&self, name: &str) -> Result<&[C]> {
        let slot = self.table.position(name)?;
        Ok(&self.children[slot])
    }

    /// Read a repetition without creating anything.
    pub fn peek(&self, name: &str, repetition: usize) -> Result<Option<&C>> {
        let slot = self.table.position(name)?;
        Ok(self.children[slot].get(repetition))
    }

    /// Children of the slot at a declaration position.
    pub fn repetitions_at(&self, slot: usize) -> &[C] {
        self.children.get(slot).map_or(&[], Vec::as_slice)
    }

    /// Slots in declaration order paired with their materialized children.
    pub fn slots(&self) -> impl Iterator<Item = (&SlotDeclaration, &[C])> {
        self.table
            .iter()
            .zip(self.children.iter().map(Vec::as_slice))
    }

    /// Find a repetition, or check that it may be created next.
    ///
    /// Fails with `UnknownSlot` for an undeclared name, `MaxOccursExceeded`
    /// when `repetition` is beyond the declared bound, and
    /// `RepetitionOutOfSequence` when it is more than one past the current
    /// count.
    pub fn lookup(&self, name: &str, repetition: usize) -> Result<Lookup<'_, C>> {
        let slot = self.table.position(name)?;
        let declaration = &self.table.as_slice()[slot];
        let existing = &self.children[slot];

        if let Some(child) = existing.get(repetition) {
            return Ok(Lookup::Occupied(child));
        }

        if !declaration.max_occurs.admits(repetition) {
            return Err(Hl7Error::MaxOccursExceeded {
                container: self.table.name().to_string(),
                slot: declaration.name.clone(),
                requested: repetition,
                max_occurs: declaration.max_occurs.bound().unwrap_or(u32::MAX),
            });
        }

        if repetition > existing.len() {
            return Err(Hl7Error::RepetitionOutOfSequence {
                container: self.table.name().to_string(),
                slot: declaration.name.clone(),
                requested: repetition,
                count: existing.len(),
            });
        }

        Ok(Lookup::Vacant(VacantRepetition {
            container: self.id,
            slot,
            repetition,
        }))
    }

    /// Append the child a [`VacantRepetition`] was issued for.
    ///
    /// Panics if the vacancy came from another container or has already been
    /// filled.
    pub fn fill(&mut self, vacant: VacantRepetition, child: C) -> &mut C {
        assert_eq!(
            vacant.container,
            self.id,
            "vacancy for slot {} was issued by another container than '{}'",
            vacant.slot,
            self.table.name()
        );
        let children = &mut self.children[vacant.slot];
        assert_eq!(
            children.len(),
            vacant.repetition,
            "repetition {} of slot {} in '{}' was filled out of turn",
            vacant.repetition,
            vacant.slot,
            self.table.name()
        );
        children.push(child);
        &mut children[vacant.repetition]
    }

    /// Return a repetition, creating it with `create` if it is the next one.
    pub fn get_repetition_with<F>(&mut self, name: &str, repetition: usize, create: F) -> Result<&mut C>
    where
        F: FnOnce(&SlotDeclaration) -> Result<C>,
    {
        let vacant = match self.lookup(name, repetition)? {
            Lookup::Occupied(_) => None,
            Lookup::Vacant(vacant) => Some(vacant),
        };

        match vacant {
            Some(vacant) => {
                let child = create(&self.table.as_slice()[vacant.slot])?;
                tracing::debug!(
                    "Materialized {}[{}] in '{}'",
                    name,
                    repetition,
                    self.table.name()
                );
                Ok(self.fill(vacant, child))
            }
            None => {
                let slot = self.table.position(name)?;
                Ok(&mut self.children[slot][repetition])
            }
        }
    }

    /// First repetition of a slot, created if the slot is still empty.
    pub fn get_first_with<F>(&mut self, name: &str, create: F) -> Result<&mut C>
    where
        F: FnOnce(&SlotDeclaration) -> Result<C>,
    {
        self.get_repetition_with(name, 0, create)
    }
}
