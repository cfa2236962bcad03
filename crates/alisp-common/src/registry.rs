//! Opaque handle registry for external resources.
//! 外部资源的不透明句柄注册表。
//!
//! Native modules hand out `Handle`s for streams, files or servers instead of
//! the resources themselves. A handle is a 32-bit token:
//!
//! ```text
//!  31      30..23     22      21..16       15..0
//! [inline][  tag   ][valid][generation][   index   ]
//! ```
//!
//! The first `INLINE_SLOTS` resources live in a fixed array, the rest in a
//! growable store. Freed slots are reused with a bumped generation so a
//! handle that outlived its resource never resolves again.

use thiserror::Error;

/// Number of slots kept in the fixed inline array.
/// 固定内联数组中的槽位数量。
pub const INLINE_SLOTS: usize = 10;

const INLINED_BIT: u32 = 1 << 31;
const TAG_SHIFT: u32 = 23;
const TAG_MASK: u32 = 0xFF;
const VALID_BIT: u32 = 1 << 22;
const GENERATION_SHIFT: u32 = 16;
const GENERATION_MASK: u32 = 0x3F;
const INDEX_MASK: u32 = 0xFFFF;
const MAX_DYNAMIC_SLOTS: usize = INDEX_MASK as usize + 1;

/// Errors raised by a registry.
/// 注册表错误。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("registry {tag} is full")]
    Exhausted { tag: u8 },
}

/// An opaque resource handle.
/// 不透明的资源句柄。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

impl Handle {
    fn encode(tag: u8, inline: bool, generation: u8, index: usize) -> Self {
        let mut raw = ((tag as u32) << TAG_SHIFT)
            | VALID_BIT
            | (((generation as u32) & GENERATION_MASK) << GENERATION_SHIFT)
            | (index as u32 & INDEX_MASK);
        if inline {
            raw |= INLINED_BIT;
        }
        Handle(raw)
    }

    /// Rebuild a handle from a raw token, e.g. one stored in a script integer.
    /// 从原始整数重建句柄。
    pub fn from_raw(raw: u32) -> Self {
        Handle(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn tag(self) -> u8 {
        ((self.0 >> TAG_SHIFT) & TAG_MASK) as u8
    }

    pub fn is_inline(self) -> bool {
        self.0 & INLINED_BIT != 0
    }

    pub fn is_valid(self) -> bool {
        self.0 & VALID_BIT != 0
    }

    pub fn generation(self) -> u8 {
        ((self.0 >> GENERATION_SHIFT) & GENERATION_MASK) as u8
    }

    pub fn index(self) -> usize {
        (self.0 & INDEX_MASK) as usize
    }
}

struct Slot<T> {
    generation: u8,
    value: Option<T>,
}

impl<T> Slot<T> {
    fn empty() -> Self {
        Self {
            generation: 0,
            value: None,
        }
    }
}

/// A registry of resources of one kind, identified by `TAG`.
/// 同一类资源的注册表，由 `TAG` 区分。
///
/// Not synchronized: callers follow the evaluator's single-writer discipline.
pub struct Registry<T, const TAG: u8> {
    inline: [Slot<T>; INLINE_SLOTS],
    dynamic: Vec<Slot<T>>,
    free_inline: Vec<usize>,
    free_dynamic: Vec<usize>,
    len: usize,
}

impl<T, const TAG: u8> Registry<T, TAG> {
    pub fn new() -> Self {
        Self {
            inline: std::array::from_fn(|_| Slot::empty()),
            dynamic: Vec::new(),
            // Popped from the back, so slot 0 is handed out first.
            free_inline: (0..INLINE_SLOTS).rev().collect(),
            free_dynamic: Vec::new(),
            len: 0,
        }
    }

    /// Number of live resources.
    /// 存活资源数量。
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store a resource and return its handle.
    /// 存入资源并返回句柄。
    pub fn put(&mut self, resource: T) -> Result<Handle, RegistryError> {
        let handle = if let Some(index) = self.free_inline.pop() {
            let slot = &mut self.inline[index];
            slot.value = Some(resource);
            Handle::encode(TAG, true, slot.generation, index)
        } else if let Some(index) = self.free_dynamic.pop() {
            let slot = &mut self.dynamic[index];
            slot.value = Some(resource);
            Handle::encode(TAG, false, slot.generation, index)
        } else {
            if self.dynamic.len() >= MAX_DYNAMIC_SLOTS {
                return Err(RegistryError::Exhausted { tag: TAG });
            }
            let index = self.dynamic.len();
            self.dynamic.push(Slot {
                generation: 0,
                value: Some(resource),
            });
            Handle::encode(TAG, false, 0, index)
        };
        self.len += 1;
        Ok(handle)
    }

    /// Look up a live resource.
    /// 查找存活的资源。
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slot(handle)?.value.as_ref()
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slot_mut(handle)?.value.as_mut()
    }

    /// Remove a resource; its handle and every copy of it become stale.
    /// 移除资源；其句柄及所有副本都将失效。
    pub fn destroy(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slot_mut(handle)?;
        let value = slot.value.take()?;
        slot.generation = (slot.generation + 1) & GENERATION_MASK as u8;
        if handle.is_inline() {
            self.free_inline.push(handle.index());
        } else {
            self.free_dynamic.push(handle.index());
        }
        self.len -= 1;
        Some(value)
    }

    /// Whether `handle` names a live resource of this registry.
    /// 判断句柄是否指向本注册表中存活的资源。
    ///
    /// Generations are 6 bits wide and wrap after 64 reuses of a slot, so a
    /// handle that has been stale for that long resolves again.
    pub fn belongs(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    fn slot(&self, handle: Handle) -> Option<&Slot<T>> {
        if handle.tag() != TAG || !handle.is_valid() {
            return None;
        }
        let slot = if handle.is_inline() {
            self.inline.get(handle.index())?
        } else {
            self.dynamic.get(handle.index())?
        };
        (slot.generation == handle.generation()).then_some(slot)
    }

    fn slot_mut(&mut self, handle: Handle) -> Option<&mut Slot<T>> {
        if handle.tag() != TAG || !handle.is_valid() {
            return None;
        }
        let slot = if handle.is_inline() {
            self.inline.get_mut(handle.index())?
        } else {
            self.dynamic.get_mut(handle.index())?
        };
        (slot.generation == handle.generation()).then_some(slot)
    }
}

impl<T, const TAG: u8> Default for Registry<T, TAG> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_bit_layout() {
        let handle = Handle::encode(0x5A, true, 3, 7);
        assert!(handle.is_inline());
        assert!(handle.is_valid());
        assert_eq!(handle.tag(), 0x5A);
        assert_eq!(handle.generation(), 3);
        assert_eq!(handle.index(), 7);
        assert_eq!(handle.raw() & VALID_BIT, VALID_BIT);
    }

    #[test]
    fn generation_wraps() {
        let mut registry: Registry<u8, 1> = Registry::new();
        let mut handle = registry.put(0).unwrap();
        for _ in 0..=GENERATION_MASK {
            registry.destroy(handle);
            handle = registry.put(0).unwrap();
        }
        assert_eq!(handle.index(), 0);
        assert_eq!(handle.generation(), 0);
    }

    #[test]
    fn stale_handle_resolves_after_full_wrap() {
        let mut registry: Registry<u8, 1> = Registry::new();
        let stale = registry.put(1).unwrap();
        let mut handle = stale;
        for _ in 0..=GENERATION_MASK {
            registry.destroy(handle);
            assert!(!registry.belongs(stale));
            handle = registry.put(2).unwrap();
        }
        assert_eq!(handle, stale);
        assert!(registry.belongs(stale));
        assert_eq!(registry.get(stale), Some(&2));
    }
}
