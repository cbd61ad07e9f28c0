//! End-to-end interpreter tests over a hand-built object universe.
//!
//! Each program parks its result in an Association literal (`130`
//! store-and-pop into literal variable 0) and then spins on a backward
//! jump, so a fixed cycle budget is always safe to run.

mod common;

use common::{Universe, LOOP_FOREVER, STORE_LITERAL0};
use st80_vm::consts::*;
use st80_vm::error::InterpreterError;
use st80_vm::host::HeadlessHost;
use st80_vm::interpreter::Interpreter;
use st80_vm::memory::from_int;

fn int(value: i32) -> Oop {
    from_int(value).unwrap()
}

#[test]
fn arithmetic_primitive_computes_without_a_method() {
    let mut universe = Universe::new();
    let assoc = universe.association();
    let method = universe.method(
        0,
        0,
        &[assoc, int(3), int(4)],
        &[33, 34, 176, 130, STORE_LITERAL0, LOOP_FOREVER[0], LOOP_FOREVER[1]],
    );

    let vm = universe_run(universe, method, 12);
    assert_eq!(assoc_value(&vm, assoc), int(7));
    assert_eq!(int(7), 0x000f);
}

#[test]
fn multiply_overflow_falls_back_to_the_method_body() {
    let mut universe = Universe::new();
    let assoc = universe.association();

    let star = universe.symbol("*");
    let body = universe.method(1, 1, &[int(999)], &[32, 124]);
    universe.fill_class(CLASS_SMALL_INTEGER, 0x8000, &[(star, body)]);
    universe.special_selector(8, star, 1);

    let method = universe.method(
        0,
        0,
        &[assoc, int(16000), int(1000)],
        &[33, 34, 184, 130, STORE_LITERAL0, LOOP_FOREVER[0], LOOP_FOREVER[1]],
    );

    let vm = universe_run(universe, method, 24);
    assert_eq!(assoc_value(&vm, assoc), int(999));
}

#[test]
fn jump_on_false_skips_when_false() {
    let mut universe = Universe::new();
    let assoc = universe.association();
    // false: 153 jumps over [33, 144]; lands on the 222 push
    let method = universe.method(
        0,
        0,
        &[assoc, int(111), int(222)],
        &[114, 153, 33, 144, 34, 130, STORE_LITERAL0, LOOP_FOREVER[0], LOOP_FOREVER[1]],
    );
    let vm = universe_run(universe, method, 12);
    assert_eq!(assoc_value(&vm, assoc), int(222));
}

#[test]
fn jump_on_false_falls_through_when_true() {
    let mut universe = Universe::new();
    let assoc = universe.association();
    // true: no jump; 111 is pushed and the short jump skips the 222 push
    let method = universe.method(
        0,
        0,
        &[assoc, int(111), int(222)],
        &[113, 153, 33, 144, 34, 130, STORE_LITERAL0, LOOP_FOREVER[0], LOOP_FOREVER[1]],
    );
    let vm = universe_run(universe, method, 12);
    assert_eq!(assoc_value(&vm, assoc), int(111));
}

#[test]
fn non_boolean_condition_sends_must_be_boolean() {
    let mut universe = Universe::new();
    let assoc = universe.association();

    let marker = universe.method(0, 0, &[int(333)], &[32, 124]);
    let undefined = universe.undefined_object_class;
    universe.fill_class(undefined, 0x8000, &[(SYMBOL_MUST_BE_BOOLEAN, marker)]);

    let method = universe.method(
        0,
        0,
        &[assoc],
        &[115, 153, 130, STORE_LITERAL0, LOOP_FOREVER[0], LOOP_FOREVER[1]],
    );
    let vm = universe_run(universe, method, 16);
    assert_eq!(assoc_value(&vm, assoc), int(333));
}

#[test]
fn block_value_runs_the_block_body() {
    let mut universe = Universe::new();
    let assoc = universe.association();

    let block_copy = universe.symbol("blockCopy:");
    let value_one = universe.symbol("value:");
    universe.special_selector(24, block_copy, 1);
    universe.special_selector(26, value_one, 1);

    // [:x | x + 1] value: 5
    let method = universe.method(
        0,
        1,
        &[assoc, int(5)],
        &[
            137, 118, 200, // thisContext, 1, blockCopy:
            164, 5, // jump over the block body
            104, 16, 118, 176, 125, // :x | x + 1, block return
            33, 202, // 5, value:
            130, STORE_LITERAL0, LOOP_FOREVER[0], LOOP_FOREVER[1],
        ],
    );
    let vm = universe_run(universe, method, 24);
    assert_eq!(assoc_value(&vm, assoc), int(6));
}

#[test]
fn unknown_selector_synthesizes_a_message() {
    let mut universe = Universe::new();
    let assoc = universe.association();

    let foo_bar = universe.symbol("foo:bar:");
    let dnu_body = universe.method(
        1,
        1,
        &[assoc],
        &[16, 130, STORE_LITERAL0, LOOP_FOREVER[0], LOOP_FOREVER[1]],
    );
    universe.fill_class(
        CLASS_SMALL_INTEGER,
        0x8000,
        &[(SYMBOL_DOES_NOT_UNDERSTAND, dnu_body)],
    );

    let method = universe.method(
        0,
        0,
        &[foo_bar, int(3), int(1), int(2)],
        &[33, 34, 35, 240, LOOP_FOREVER[0], LOOP_FOREVER[1]],
    );
    let vm = universe_run(universe, method, 24);

    let message = assoc_value(&vm, assoc);
    assert_eq!(vm.memory().class_of(message), CLASS_MESSAGE);
    assert_eq!(
        vm.memory().fetch_pointer(message::SELECTOR, message).unwrap(),
        foo_bar
    );
    let arguments = vm
        .memory()
        .fetch_pointer(message::ARGUMENTS, message)
        .unwrap();
    assert_eq!(vm.memory().class_of(arguments), CLASS_ARRAY);
    assert_eq!(vm.memory().word_length_of(arguments), 2);
    assert_eq!(vm.memory().fetch_pointer(0, arguments).unwrap(), int(1));
    assert_eq!(vm.memory().fetch_pointer(1, arguments).unwrap(), int(2));
}

#[test]
fn missing_does_not_understand_is_fatal() {
    let mut universe = Universe::new();
    let foo = universe.symbol("foo");
    let method = universe.method(0, 0, &[foo, int(3)], &[33, 208]);

    let context = universe.context(method, NIL);
    universe.schedule(context);
    let mut vm = Interpreter::new(universe.memory, HeadlessHost::new());
    vm.initialize().unwrap();

    let error = (0..8).find_map(|_| vm.cycle().err()).expect("send fails");
    assert!(matches!(
        error,
        InterpreterError::RecursiveDoesNotUnderstand { selector } if selector == SYMBOL_DOES_NOT_UNDERSTAND
    ));
}

#[test]
fn failed_primitive_leaves_the_arguments_for_the_body() {
    let mut universe = Universe::new();
    let assoc = universe.association();

    let plus = universe.symbol("+");
    // the fallback answers its (intact) argument
    let body = universe.method(1, 1, &[], &[16, 124]);
    universe.fill_class(CLASS_SYMBOL, 0x8000, &[(plus, body)]);
    universe.special_selector(0, plus, 1);

    let junk = universe.symbol("junk");
    let method = universe.method(
        0,
        0,
        &[assoc, junk, int(4)],
        &[33, 34, 176, 130, STORE_LITERAL0, LOOP_FOREVER[0], LOOP_FOREVER[1]],
    );
    let vm = universe_run(universe, method, 24);
    assert_eq!(assoc_value(&vm, assoc), int(4));
}

#[test]
fn perform_reroutes_the_send() {
    let mut universe = Universe::new();
    let assoc = universe.association();

    let perform = universe.symbol("perform:");
    let incr = universe.symbol("incr");
    let incr_body = universe.method(0, 0, &[], &[112, 118, 176, 124]);
    let perform_method = universe.primitive_method(83, 1, &[], &[123]);
    universe.fill_class(
        CLASS_SMALL_INTEGER,
        0x8000,
        &[(perform, perform_method), (incr, incr_body)],
    );

    let method = universe.method(
        0,
        0,
        &[assoc, int(3), incr, perform],
        &[33, 34, 227, 130, STORE_LITERAL0, LOOP_FOREVER[0], LOOP_FOREVER[1]],
    );
    let vm = universe_run(universe, method, 24);
    assert_eq!(assoc_value(&vm, assoc), int(4));
}

#[test]
fn wait_consumes_an_excess_signal() {
    let mut universe = Universe::new();
    let assoc = universe.association();

    let semaphore = universe
        .memory
        .instantiate_with_pointers(CLASS_SEMAPHORE, 3)
        .unwrap();
    universe
        .memory
        .store_word(SEMAPHORE_EXCESS_SIGNALS, semaphore, int(1))
        .unwrap();

    let wait = universe.symbol("wait");
    let wait_method = universe.primitive_method(86, 0, &[], &[123]);
    universe.fill_class(CLASS_SEMAPHORE, 0x8000, &[(wait, wait_method)]);

    let method = universe.method(
        0,
        0,
        &[assoc, semaphore, wait],
        &[33, 210, 130, STORE_LITERAL0, LOOP_FOREVER[0], LOOP_FOREVER[1]],
    );
    let vm = universe_run(universe, method, 16);
    // wait answered the semaphore itself and banked signal was consumed
    assert_eq!(assoc_value(&vm, assoc), semaphore);
    assert_eq!(
        vm.memory()
            .fetch_word(SEMAPHORE_EXCESS_SIGNALS, semaphore)
            .unwrap(),
        int(0)
    );
}

#[test]
fn at_put_primitives_index_past_fixed_fields() {
    let mut universe = Universe::new();
    let assoc = universe.association();

    let at_put = universe.symbol("at:put:");
    let at_put_method = universe.primitive_method(61, 2, &[], &[123]);
    universe.fill_class(CLASS_ARRAY, 0x8000 | 0x2000, &[(at_put, at_put_method)]);

    let target = universe.array(&[NIL, NIL, NIL]);
    let method = universe.method(
        0,
        0,
        &[assoc, target, int(2), int(7), at_put],
        &[33, 34, 35, 244, 130, STORE_LITERAL0, LOOP_FOREVER[0], LOOP_FOREVER[1]],
    );
    let vm = universe_run(universe, method, 16);
    assert_eq!(assoc_value(&vm, assoc), int(7));
    assert_eq!(vm.memory().fetch_pointer(1, target).unwrap(), int(7));
}

#[test]
fn word_at_boxes_large_values_little_endian() {
    let mut universe = Universe::new();
    let assoc = universe.association();

    let at = universe.symbol("at:");
    let at_method = universe.primitive_method(60, 1, &[], &[123]);
    universe.fill_class(CLASS_DISPLAY_BITMAP, 0x4000 | 0x2000, &[(at, at_method)]);

    let words = universe
        .memory
        .instantiate_with_words(CLASS_DISPLAY_BITMAP, 2)
        .unwrap();
    universe.memory.store_word(0, words, 40000).unwrap();

    let method = universe.method(
        0,
        0,
        &[assoc, words, int(1), at],
        &[33, 34, 227, 130, STORE_LITERAL0, LOOP_FOREVER[0], LOOP_FOREVER[1]],
    );
    let vm = universe_run(universe, method, 16);

    let boxed = assoc_value(&vm, assoc);
    assert_eq!(vm.memory().class_of(boxed), CLASS_LARGE_POSITIVE_INTEGER);
    // 40000 = 0x9c40, least-significant byte first
    assert_eq!(vm.memory().bytes_of(boxed).unwrap(), &[0x40, 0x9c]);
}

#[test]
fn new_with_arg_builds_an_indexable_instance() {
    let mut universe = Universe::new();
    let assoc = universe.association();

    let new_colon = universe.symbol("new:");
    let new_method = universe.primitive_method(71, 1, &[], &[123]);
    // class objects answer to the Array metaclass stand-in
    universe.fill_class(CLASS_ARRAY, 0x8000 | 0x2000, &[(new_colon, new_method)]);

    let byte_class = universe.class(0x2000, &[]);
    let method = universe.method(
        0,
        0,
        &[assoc, byte_class, int(5), new_colon],
        &[33, 34, 227, 130, STORE_LITERAL0, LOOP_FOREVER[0], LOOP_FOREVER[1]],
    );
    let vm = universe_run(universe, method, 16);

    let instance = assoc_value(&vm, assoc);
    assert_eq!(vm.memory().class_of(instance), byte_class);
    assert_eq!(vm.memory().byte_length_of(instance), 5);
}

fn universe_run(universe: Universe, method: Oop, cycles: usize) -> Interpreter<HeadlessHost> {
    universe.run(method, NIL, cycles)
}

fn assoc_value(vm: &Interpreter<HeadlessHost>, assoc: Oop) -> Oop {
    vm.memory().fetch_pointer(ASSOCIATION_VALUE, assoc).unwrap()
}
