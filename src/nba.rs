//! NBA staging gate.
//!
//! Holds the value a propagation computed until the scheduled NBA commit
//! point, where it becomes externally visible. The destination is either
//! packed (value in the low two bits of a reference-sized word whose upper
//! bits belong to the destination reference) or a separate value field.

use crate::error::{KernelError, KernelResult};
use crate::event::{EventAction, EventBlock};
use crate::id::SignalId;
use crate::value::{Logic, LOGIC_BITS_MASK};
use crate::wheel::FutureQueue;

/// Where a gate keeps its staged value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStorage {
    /// Reference payload in the upper bits, value in bits `0..2`.
    Packed(u64),
    Separate(Logic),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NbaGate {
    storage: GateStorage,
    visible: Logic,
    commit_pending: bool,
}

impl NbaGate {
    /// A gate that packs its value into `reference`. The reference must
    /// leave the two value bits clear.
    pub fn packed(reference: u64, init: Logic) -> KernelResult<Self> {
        if reference & LOGIC_BITS_MASK != 0 {
            return Err(KernelError::PackedReferenceMisaligned(reference));
        }
        Ok(NbaGate {
            storage: GateStorage::Packed(reference | u64::from(init.to_bits())),
            visible: init,
            commit_pending: false,
        })
    }

    pub fn separate(init: Logic) -> Self {
        NbaGate {
            storage: GateStorage::Separate(init),
            visible: init,
            commit_pending: false,
        }
    }

    #[inline]
    pub fn is_packed(&self) -> bool {
        matches!(self.storage, GateStorage::Packed(_))
    }

    #[inline]
    pub fn storage(&self) -> GateStorage {
        self.storage
    }

    /// The value waiting for the next commit.
    pub fn staged(&self) -> Logic {
        match self.storage {
            GateStorage::Packed(word) => Logic::from_bits((word & LOGIC_BITS_MASK) as u8),
            GateStorage::Separate(value) => value,
        }
    }

    /// The destination reference of a packed gate.
    pub fn reference(&self) -> Option<u64> {
        match self.storage {
            GateStorage::Packed(word) => Some(word & !LOGIC_BITS_MASK),
            GateStorage::Separate(_) => None,
        }
    }

    /// Last value materialized by a commit.
    #[inline]
    pub fn visible(&self) -> Logic {
        self.visible
    }

    #[inline]
    pub fn is_commit_pending(&self) -> bool {
        self.commit_pending
    }

    /// Write `value` into the staging slot without scheduling anything.
    pub fn stage_value(&mut self, value: Logic) {
        self.storage = match self.storage {
            GateStorage::Packed(word) => {
                GateStorage::Packed((word & !LOGIC_BITS_MASK) | u64::from(value.to_bits()))
            }
            GateStorage::Separate(_) => GateStorage::Separate(value),
        };
    }

    /// Make the staged value visible. Called when the commit event fires.
    pub fn materialize(&mut self) -> Logic {
        self.visible = self.staged();
        self.commit_pending = false;
        self.visible
    }
}

/// Stage `value` and make sure exactly one commit event is pending for
/// this gate. Repeated stages before the commit fires share that event.
pub fn stage(
    gate: &mut NbaGate,
    value: Logic,
    signal: SignalId,
    queue: &mut FutureQueue,
    delay: u64,
) -> KernelResult<()> {
    gate.stage_value(value);
    if gate.commit_pending {
        log::trace!("nba: {} restaged to {}, commit already pending", signal, value);
        return Ok(());
    }
    queue.schedule(EventBlock::new(EventAction::CommitNba(signal)), delay)?;
    gate.commit_pending = true;
    log::trace!("nba: {} staged {}, commit in {} tick(s)", signal, value, delay);
    Ok(())
}
