//! Engine handle table
//!
//! Embedding applications refer to engines by an opaque [`EngineHandle`]
//! rather than an address. Handles carry a generation, so a handle kept
//! after `destroy_engine` never reaches an engine that later reuses its slot.

use crate::audio::capture::CaptureBackend;
use crate::audio::engine::{AudioEngine, EngineError};
use crate::config::{EngineConfig, HIGH_BAND_SLOTS, LOW_BAND_SLOTS};
use std::time::Duration;

/// Opaque reference to an engine in an [`EngineRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineHandle {
    index: u32,
    generation: u32,
}

impl EngineHandle {
    /// Pack into an integer suitable for a foreign caller
    pub fn to_raw(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

struct Slot<B: CaptureBackend> {
    generation: u32,
    engine: Option<AudioEngine<B>>,
}

/// Arena of engines addressed by generation-checked handles
pub struct EngineRegistry<B: CaptureBackend> {
    slots: Vec<Slot<B>>,
    free: Vec<u32>,
}

impl<B: CaptureBackend> Default for EngineRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: CaptureBackend> EngineRegistry<B> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Allocate an engine; capture is not started
    pub fn create_engine(&mut self, backend: B, config: EngineConfig) -> Result<EngineHandle, EngineError> {
        let engine = AudioEngine::new(backend, config)?;

        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.engine = Some(engine);
                EngineHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    // Generation 0 is never issued, so a zeroed raw handle is always invalid
                    generation: 1,
                    engine: Some(engine),
                });
                EngineHandle { index, generation: 1 }
            }
        };

        log::debug!("Created engine {:?}", handle);
        Ok(handle)
    }

    /// Stop and free an engine
    ///
    /// # Returns
    /// `false` if the handle was unknown or already destroyed
    pub fn destroy_engine(&mut self, handle: EngineHandle) -> bool {
        let Some(slot) = self.slot_mut(handle) else {
            log::warn!("destroy_engine: unknown handle {:?}", handle);
            return false;
        };

        // Dropping the engine stops capture
        slot.engine = None;
        slot.generation = slot.generation.wrapping_add(1).max(1);
        self.free.push(handle.index);
        log::debug!("Destroyed engine {:?}", handle);
        true
    }

    /// Start capture; idempotent
    pub fn start_engine(&mut self, handle: EngineHandle) -> bool {
        match self.get_mut(handle) {
            Ok(engine) => engine.start().is_ok(),
            Err(e) => {
                log::warn!("start_engine: {}", e);
                false
            }
        }
    }

    /// Stop capture; idempotent, unknown handles are ignored
    pub fn stop_engine(&mut self, handle: EngineHandle) {
        match self.get_mut(handle) {
            Ok(engine) => engine.stop(),
            Err(e) => log::debug!("stop_engine: {}", e),
        }
    }

    /// Fill caller buffers with the latest bands
    ///
    /// # Returns
    /// Whether the data was fresh
    pub fn poll_bands(
        &self,
        handle: EngineHandle,
        low_out: &mut [f32],
        high_out: &mut [f32],
        timeout_ms: u64,
    ) -> Result<bool, EngineError> {
        let engine = self.get(handle)?;

        let (low_len, high_len) = (low_out.len(), high_out.len());
        let low: &mut [f32; LOW_BAND_SLOTS] =
            low_out.try_into().map_err(|_| EngineError::BufferSize {
                expected: LOW_BAND_SLOTS,
                got: low_len,
            })?;
        let high: &mut [f32; HIGH_BAND_SLOTS] =
            high_out.try_into().map_err(|_| EngineError::BufferSize {
                expected: HIGH_BAND_SLOTS,
                got: high_len,
            })?;

        Ok(engine.poll_bands(low, high, Duration::from_millis(timeout_ms)))
    }

    /// Zero published bands and the freshness flag
    pub fn reset_bands(&self, handle: EngineHandle) -> Result<(), EngineError> {
        self.get(handle)?.reset_bands();
        Ok(())
    }

    pub fn get(&self, handle: EngineHandle) -> Result<&AudioEngine<B>, EngineError> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.engine.as_ref())
            .ok_or(EngineError::UnknownHandle)
    }

    pub fn get_mut(&mut self, handle: EngineHandle) -> Result<&mut AudioEngine<B>, EngineError> {
        self.slot_mut(handle)
            .and_then(|slot| slot.engine.as_mut())
            .ok_or(EngineError::UnknownHandle)
    }

    fn slot_mut(&mut self, handle: EngineHandle) -> Option<&mut Slot<B>> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.engine.is_some())
    }

    /// Number of live engines
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.engine.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
