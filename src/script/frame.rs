//! Arena of variable frames.
//!
//! Every frame points at its parent by handle. Reads walk the chain towards
//! the root; writes always land in the frame they were issued against, so a
//! child can shadow but never mutate what it inherited. Frames are
//! refcounted: a child holds one reference on its parent, and a frame is
//! freed once its count drops to zero. Handles carry a generation so a stale
//! handle to a reused slot resolves to nothing instead of someone else's
//! variables.

use super::value::ScriptValue;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Handle to a frame in a [`FrameArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId {
    index: usize,
    generation: u64,
}

#[derive(Debug)]
struct Frame {
    parent: Option<FrameId>,
    refs: usize,
    vars: HashMap<String, ScriptValue>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    frame: Option<Frame>,
}

#[derive(Debug, Default)]
struct Slots {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl Slots {
    fn get(&self, id: FrameId) -> Option<&Frame> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.frame.as_ref())
    }

    fn get_mut(&mut self, id: FrameId) -> Option<&mut Frame> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.frame.as_mut())
    }
}

/// Thread-safe frame storage shared by every context of one interpreter.
#[derive(Debug, Default)]
pub struct FrameArena {
    inner: Mutex<Slots>,
}

impl FrameArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a frame with one reference, chained to `parent`.
    ///
    /// The parent gains a reference for as long as the new frame lives. A
    /// parent handle that is no longer live yields a root frame.
    pub fn alloc(&self, parent: Option<FrameId>, vars: HashMap<String, ScriptValue>) -> FrameId {
        let mut inner = self.inner.lock();

        let parent = parent.filter(|&p| match inner.get_mut(p) {
            Some(frame) => {
                frame.refs += 1;
                true
            }
            None => {
                tracing::warn!("Allocating frame under a dead parent {:?}", p);
                false
            }
        });

        let frame = Frame {
            parent,
            refs: 1,
            vars,
        };

        if let Some(index) = inner.free.pop() {
            let slot = &mut inner.slots[index];
            slot.generation += 1;
            slot.frame = Some(frame);
            FrameId {
                index,
                generation: slot.generation,
            }
        } else {
            inner.slots.push(Slot {
                generation: 0,
                frame: Some(frame),
            });
            FrameId {
                index: inner.slots.len() - 1,
                generation: 0,
            }
        }
    }

    /// Drops a reference, freeing the frame (and cascading to its parents)
    /// when the count reaches zero.
    pub fn release(&self, id: FrameId) {
        let mut inner = self.inner.lock();
        let mut next = Some(id);
        while let Some(current) = next.take() {
            let Some(frame) = inner.get_mut(current) else {
                return;
            };
            frame.refs -= 1;
            if frame.refs > 0 {
                return;
            }
            let parent = frame.parent;
            inner.slots[current.index].frame = None;
            inner.free.push(current.index);
            next = parent;
        }
    }

    /// Resolves `name` starting at `id` and walking towards the root.
    pub fn lookup(&self, id: FrameId, name: &str) -> Option<ScriptValue> {
        let inner = self.inner.lock();
        let mut current = Some(id);
        while let Some(frame_id) = current {
            let frame = inner.get(frame_id)?;
            if let Some(value) = frame.vars.get(name) {
                return Some(value.clone());
            }
            current = frame.parent;
        }
        None
    }

    /// Binds `name` in the frame `id` itself. Returns false for stale handles.
    pub fn define(&self, id: FrameId, name: &str, value: ScriptValue) -> bool {
        self.inner.lock().get_mut(id).is_some_and(|frame| {
            frame.vars.insert(name.to_string(), value);
            true
        })
    }

    /// Copies the variables bound directly in `id`.
    pub fn locals(&self, id: FrameId) -> HashMap<String, ScriptValue> {
        self.inner
            .lock()
            .get(id)
            .map(|frame| frame.vars.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: FrameId) -> Option<FrameId> {
        self.inner.lock().get(id).and_then(|frame| frame.parent)
    }

    pub fn contains(&self, id: FrameId) -> bool {
        self.inner.lock().get(id).is_some()
    }

    /// Number of live frames.
    pub fn live(&self) -> usize {
        let inner = self.inner.lock();
        inner.slots.len() - inner.free.len()
    }
}
