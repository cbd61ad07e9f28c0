use crate::consts::Oop;
use crate::error::MemoryError;

/// Number of object-table slots addressable by a 15-bit pointer index.
pub const SLOT_COUNT: usize = 0x8000;

/// One object-table entry: class, size and representation bits plus the
/// heap payload. A slot without backing storage is free.
#[derive(Debug, Default, Clone)]
pub(crate) struct Slot {
    pub class: Oop,
    /// Payload length in 16-bit words (header excluded).
    pub size: u16,
    /// Set when the last payload byte is unused (odd byte length).
    pub odd: bool,
    /// Set when the payload words are OOPs scanned by the collector.
    pub pointers: bool,
    /// Transient collector mark.
    pub marked: bool,
    pub data: Option<Box<[u8]>>,
}

impl Slot {
    pub fn is_free(&self) -> bool {
        self.data.is_none()
    }

    pub fn byte_len(&self) -> usize {
        (self.size as usize) * 2 - usize::from(self.odd)
    }

    pub fn bytes(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.data.as_deref_mut().unwrap_or(&mut [])
    }
}

/// The object table proper. Indices are OOPs shifted right by the tag
/// bit; index 0 is never handed out (it would alias the invalid pointer).
#[derive(Debug, Clone)]
pub(crate) struct ObjectTable {
    pub slots: Vec<Slot>,
}

impl Default for ObjectTable {
    fn default() -> Self {
        Self {
            slots: vec![Slot::default(); SLOT_COUNT],
        }
    }
}

impl ObjectTable {
    /// Install an object at `index` with an explicit odd bit, as read
    /// from a snapshot. Any previous payload is replaced.
    pub fn install(&mut self, index: usize, class: Oop, bytes: &[u8], odd: bool, pointers: bool) {
        debug_assert!(bytes.len() % 2 == 0);
        let slot = &mut self.slots[index];
        slot.class = class;
        slot.size = (bytes.len() / 2) as u16;
        slot.odd = odd;
        slot.pointers = pointers;
        slot.marked = false;
        slot.data = Some(bytes.to_vec().into_boxed_slice());
    }

    /// Allocate zeroed storage of `byte_len` bytes at a known-free slot.
    pub fn allocate(
        &mut self,
        index: usize,
        byte_len: usize,
        class: Oop,
        pointers: bool,
    ) -> Result<(), MemoryError> {
        debug_assert!(self.slots[index].is_free());
        let odd = byte_len % 2 == 1;
        let rounded = byte_len + usize::from(odd);
        if rounded / 2 > u16::MAX as usize {
            return Err(MemoryError::OutOfHeap { words: rounded / 2 });
        }
        let slot = &mut self.slots[index];
        slot.class = class;
        slot.size = (rounded / 2) as u16;
        slot.odd = odd;
        slot.pointers = pointers;
        slot.marked = false;
        slot.data = Some(vec![0u8; rounded].into_boxed_slice());
        Ok(())
    }

    pub fn free(&mut self, index: usize) {
        self.slots[index] = Slot::default();
    }

    /// Linear scan for a free slot starting at `from`. Acceptable for the
    /// ~40k live objects of a V2 image.
    pub fn find_free_from(&self, from: usize) -> Option<usize> {
        (from..self.slots.len()).find(|&i| self.slots[i].is_free())
    }
}
