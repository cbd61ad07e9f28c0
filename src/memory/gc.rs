//! Mark-sweep collection.
//!
//! Roots are the register file, the transient temp roots, and every
//! well-known OOP up to [`LAST_WELL_KNOWN`]. Marking follows pointer
//! payloads and compiled-method literals; class slots are visited
//! unconditionally so a class is never reclaimed before its instances.

use crate::consts::*;
use crate::memory::{is_pointer, ObjectMemory, SLOT_COUNT};

use tracing::debug;

impl ObjectMemory {
    /// Collect every object unreachable from the root set. Runs only
    /// from the allocator, when the free pool is empty.
    pub fn collect_garbage(&mut self) {
        let mut pending: Vec<Oop> = Vec::with_capacity(256);
        pending.extend(self.registers.iter().copied());
        pending.extend(self.temps.iter().copied());
        pending.extend((0..=LAST_WELL_KNOWN).step_by(2));

        while let Some(oop) = pending.pop() {
            self.mark(oop, &mut pending);
        }

        let mut freed = 0usize;
        for index in 0..SLOT_COUNT {
            let slot = &mut self.table.slots[index];
            if slot.is_free() {
                continue;
            }
            if slot.marked {
                slot.marked = false;
            } else {
                self.table.free(index);
                freed += 1;
            }
        }

        debug!(freed, "mark-sweep finished");
    }

    fn mark(&mut self, oop: Oop, pending: &mut Vec<Oop>) {
        if !is_pointer(oop) {
            return;
        }
        let index = (oop >> 1) as usize;
        let slot = &mut self.table.slots[index];
        if slot.is_free() || slot.marked {
            return;
        }
        slot.marked = true;

        let slot = &self.table.slots[index];
        pending.push(slot.class);

        if slot.pointers {
            for field in 0..slot.size as usize {
                let value = self.fetch_word(field, oop).unwrap_or(0);
                if is_pointer(value) && value != 0 {
                    pending.push(value);
                }
            }
        } else if slot.class == CLASS_COMPILED_METHOD {
            let count = self.method_literal_count(oop).unwrap_or(0);
            for literal in 0..count {
                if let Ok(value) = self.method_literal(literal, oop) {
                    if is_pointer(value) && value != 0 {
                        pending.push(value);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Register;

    #[test]
    fn unreferenced_objects_are_reclaimed() {
        let mut memory = ObjectMemory::new();
        let kept = memory.instantiate_with_pointers(CLASS_ARRAY, 2).unwrap();
        let dropped = memory.instantiate_with_pointers(CLASS_ARRAY, 2).unwrap();
        memory.set_register(Register::Receiver, kept);

        memory.collect_garbage();

        assert!(memory.has_object(kept));
        assert!(!memory.has_object(dropped));
    }

    #[test]
    fn payload_references_and_classes_survive() {
        let mut memory = ObjectMemory::new();
        let inner = memory.instantiate_with_bytes(CLASS_STRING, 3).unwrap();
        let outer = memory.instantiate_with_pointers(CLASS_ARRAY, 1).unwrap();
        memory.store_pointer(0, outer, inner).unwrap();
        memory.add_temp(outer);

        memory.collect_garbage();

        assert!(memory.has_object(outer));
        assert!(memory.has_object(inner));
        memory.remove_temp(outer);
    }

    #[test]
    fn temp_roots_protect_locals_across_collection() {
        let mut memory = ObjectMemory::new();
        let held = memory.instantiate_with_pointers(CLASS_ARRAY, 1).unwrap();
        memory.add_temp(held);
        memory.collect_garbage();
        assert!(memory.has_object(held));

        memory.remove_temp(held);
        memory.collect_garbage();
        assert!(!memory.has_object(held));
    }
}
