//! Object-memory properties: tagging, accessors, swapping, collection.

use quickcheck_macros::quickcheck;
use st80_vm::consts::*;
use st80_vm::error::MemoryError;
use st80_vm::memory::{self, ObjectMemory, Register};

#[quickcheck]
fn tagged_integers_round_trip(value: i16) -> bool {
    if !memory::is_integer_value(value.into()) {
        return memory::from_int(value.into()).is_err();
    }
    let oop = memory::from_int(value.into()).unwrap();
    memory::is_integer(oop) && memory::to_int(oop) == value
}

#[quickcheck]
fn immediate_oops_survive_decode_encode(raw: u16) -> bool {
    let oop = raw | 1;
    memory::from_int(memory::to_int(oop).into()).unwrap() == oop
}

#[test]
fn sign_extension_at_the_boundaries() {
    assert_eq!(memory::to_int(0x3fff * 2 + 1), 16383);
    assert_eq!(memory::to_int(0x4000 * 2 + 1), -16384);
    assert!(memory::from_int(16384).is_err());
}

#[test]
fn class_of_an_immediate_is_the_small_integer_class() {
    let memory = ObjectMemory::new();
    assert_eq!(memory.class_of(0x0007), CLASS_SMALL_INTEGER);
}

#[test]
fn accessors_reject_out_of_bounds_fields() {
    let mut memory = ObjectMemory::new();
    let oop = memory.instantiate_with_pointers(CLASS_ARRAY, 2).unwrap();

    assert!(memory.fetch_pointer(1, oop).is_ok());
    assert!(matches!(
        memory.fetch_word(2, oop),
        Err(MemoryError::OutOfBounds { .. })
    ));
    assert!(matches!(
        memory.store_byte(4, oop, 0),
        Err(MemoryError::OutOfBounds { .. })
    ));
    assert!(matches!(
        memory.fetch_pointer(0, 0x4002),
        Err(MemoryError::NotAnObject(_))
    ));
}

#[test]
fn odd_byte_objects_report_their_true_length() {
    let mut memory = ObjectMemory::new();
    let oop = memory.instantiate_with_bytes(CLASS_STRING, 7).unwrap();
    assert_eq!(memory.byte_length_of(oop), 7);
    assert_eq!(memory.word_length_of(oop), 4);
    assert!(memory.store_byte(6, oop, 0xaa).is_ok());
    assert!(memory.store_byte(7, oop, 0xaa).is_err());
}

#[test]
fn swapping_pointers_twice_is_the_identity() {
    let mut memory = ObjectMemory::new();
    let a = memory.instantiate_with_pointers(CLASS_ARRAY, 1).unwrap();
    let b = memory.instantiate_with_bytes(CLASS_STRING, 3).unwrap();
    memory.store_pointer(0, a, TRUE).unwrap();
    memory.store_byte(0, b, 0x42).unwrap();

    memory.swap_pointers(a, b).unwrap();
    // identities stayed with the pointers, payloads moved
    assert_eq!(memory.class_of(a), CLASS_STRING);
    assert_eq!(memory.fetch_byte(0, a).unwrap(), 0x42);
    assert_eq!(memory.fetch_pointer(0, b).unwrap(), TRUE);

    memory.swap_pointers(a, b).unwrap();
    assert_eq!(memory.class_of(a), CLASS_ARRAY);
    assert_eq!(memory.fetch_pointer(0, a).unwrap(), TRUE);
    assert_eq!(memory.class_of(b), CLASS_STRING);
    assert_eq!(memory.fetch_byte(0, b).unwrap(), 0x42);
}

#[test]
fn collection_keeps_exactly_the_reachable_graph() {
    let mut memory = ObjectMemory::new();

    let root = memory.instantiate_with_pointers(CLASS_ARRAY, 2).unwrap();
    let kept = memory.instantiate_with_pointers(CLASS_ARRAY, 1).unwrap();
    let chained = memory.instantiate_with_bytes(CLASS_STRING, 4).unwrap();
    let garbage = memory.instantiate_with_pointers(CLASS_ARRAY, 1).unwrap();

    memory.store_pointer(0, root, kept).unwrap();
    memory.store_pointer(0, kept, chained).unwrap();
    memory.set_register(Register::ActiveContext, root);

    memory.collect_garbage();

    assert!(memory.has_object(root));
    assert!(memory.has_object(kept));
    assert!(memory.has_object(chained));
    assert!(!memory.has_object(garbage));
}

#[test]
fn method_literals_keep_their_referents_alive() {
    let mut memory = ObjectMemory::new();

    let referent = memory.instantiate_with_pointers(CLASS_ARRAY, 1).unwrap();
    let method = memory
        .instantiate_with_bytes(CLASS_COMPILED_METHOD, 2 + 2 + 1)
        .unwrap();
    memory.store_byte(0, method, 0).unwrap();
    memory.store_byte(1, method, 1 << 1).unwrap();
    memory.store_word(1, method, referent).unwrap();
    memory.set_register(Register::Method, method);

    memory.collect_garbage();

    assert!(memory.has_object(method));
    assert!(memory.has_object(referent));
}

#[test]
fn instance_enumeration_walks_in_table_order() {
    let mut memory = ObjectMemory::new();
    let first = memory.instantiate_with_bytes(CLASS_STRING, 1).unwrap();
    let _other = memory.instantiate_with_pointers(CLASS_ARRAY, 1).unwrap();
    let second = memory.instantiate_with_bytes(CLASS_STRING, 1).unwrap();

    assert_eq!(memory.next_instance_of(CLASS_STRING, None), Some(first));
    assert_eq!(
        memory.next_instance_of(CLASS_STRING, Some(first)),
        Some(second)
    );
    assert_eq!(memory.next_instance_of(CLASS_STRING, Some(second)), None);
}

#[test]
fn allocation_reuses_collected_slots() {
    let mut memory = ObjectMemory::new();
    let doomed = memory.instantiate_with_pointers(CLASS_ARRAY, 1).unwrap();
    memory.collect_garbage();
    assert!(!memory.has_object(doomed));

    let reborn = memory.instantiate_with_pointers(CLASS_ARRAY, 1).unwrap();
    assert_eq!(reborn, doomed);
}
