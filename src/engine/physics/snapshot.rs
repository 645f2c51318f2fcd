// Save/load of simulation state for rollback

use super::body::BodyHandle;
use super::error::{PhysicsError, Result};
use super::history::HistoryBuffer;
use super::manifold::ContactCache;
use super::world::PhysicsWorld;
use crate::core::{Fix64, Vec2Fix};

/// Mutable per-tick state of one body
///
/// Plain old data: the byte form is the in-memory layout, so it can be sent
/// over the wire or stored in a ring of saved frames as-is.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BodyState {
    pub position: Vec2Fix,
    pub angle: Fix64,
    pub linear_velocity: Vec2Fix,
    pub angular_velocity: Fix64,
    pub force: Vec2Fix,
    pub torque: Fix64,
    pub bias_velocity: Vec2Fix,
    pub bias_rotation: Fix64,
}

impl BodyState {
    pub const SIZE: usize = std::mem::size_of::<BodyState>();

    pub fn to_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(PhysicsError::StateDecode {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        Ok(bytemuck::pod_read_unaligned(bytes))
    }
}

/// Everything needed to rewind a world to an earlier tick
///
/// Body membership is not part of the snapshot: the world being restored
/// must contain the same bodies it had when the snapshot was taken.
#[derive(Debug, Clone)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub bodies: Vec<(BodyHandle, BodyState)>,
    pub overlaps: Vec<(BodyHandle, Vec<BodyHandle>)>,
    pub histories: Vec<(BodyHandle, HistoryBuffer)>,
    pub contacts: ContactCache,
}

impl WorldSnapshot {
    pub fn state(&self, handle: BodyHandle) -> Option<&BodyState> {
        self.bodies.iter().find(|(h, _)| *h == handle).map(|(_, s)| s)
    }
}

/// Order-dependent digest of the simulated state
///
/// Two peers in sync produce the same value; any single-bit drift in a
/// position, velocity or pending force changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateChecksum(pub u64);

const SEED: u64 = 0x517c_c1b7_2722_0a95;

impl StateChecksum {
    pub fn from_world(world: &PhysicsWorld) -> Self {
        let mut checksum = Self(world.tick);
        for body in world.bodies() {
            checksum.mix(body.handle().to_bits());
            let state = body.state();
            for word in bytemuck::cast_slice::<BodyState, u64>(std::slice::from_ref(&state)) {
                checksum.mix(*word);
            }
        }
        checksum
    }

    fn mix(&mut self, word: u64) {
        self.0 = (self.0.rotate_left(5) ^ word).wrapping_mul(SEED);
    }
}

impl PhysicsWorld {
    pub fn save_body_state(&self, handle: BodyHandle) -> Result<BodyState> {
        self.body(handle).map(|b| b.state()).ok_or(PhysicsError::InvalidBody)
    }

    /// Overwrite a body's dynamic state and resync its shapes and bounds
    pub fn load_body_state(&mut self, handle: BodyHandle, state: &BodyState) -> Result<()> {
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::InvalidBody)?;
        body.restore_state(state);
        self.sync_body(handle);
        Ok(())
    }

    pub fn save_snapshot(&self) -> WorldSnapshot {
        let mut snapshot = WorldSnapshot {
            tick: self.tick,
            bodies: Vec::with_capacity(self.active.len()),
            overlaps: Vec::new(),
            histories: Vec::new(),
            contacts: self.contact_cache.clone(),
        };
        for body in self.bodies() {
            let handle = body.handle();
            snapshot.bodies.push((handle, body.state()));
            if let Some(overlapping) = body.overlapping() {
                snapshot.overlaps.push((handle, overlapping.to_vec()));
            }
            if let Some(history) = body.history() {
                snapshot.histories.push((handle, history.clone()));
            }
        }
        snapshot
    }

    /// Rewind to `snapshot`. Fails without touching the world if any body
    /// it names no longer exists.
    pub fn load_snapshot(&mut self, snapshot: &WorldSnapshot) -> Result<()> {
        if let Some((missing, _)) = snapshot
            .bodies
            .iter()
            .find(|(handle, _)| !self.bodies.contains(*handle))
        {
            log::warn!("Snapshot of tick {} names missing body {:?}", snapshot.tick, missing);
            return Err(PhysicsError::InvalidBody);
        }

        for (handle, state) in &snapshot.bodies {
            self.load_body_state(*handle, state)?;
        }
        for (handle, overlapping) in &snapshot.overlaps {
            if let Some(area) = self.bodies.get_mut(*handle).and_then(|b| b.area.as_mut()) {
                area.set_overlapping(overlapping);
            }
        }
        for (handle, history) in &snapshot.histories {
            if let Some(body) = self.bodies.get_mut(*handle) {
                body.set_history(Some(history.clone()));
            }
        }
        self.contact_cache = snapshot.contacts.clone();
        self.tick = snapshot.tick;

        log::debug!("Rolled back to tick {}", snapshot.tick);
        Ok(())
    }

    pub fn checksum(&self) -> StateChecksum {
        StateChecksum::from_world(self)
    }
}
