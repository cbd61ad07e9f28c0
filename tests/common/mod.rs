//! A hand-built object universe for interpreter tests.
//!
//! Installs live objects at every reserved OOP, wires up a scheduler
//! with one runnable process, and offers small constructors for
//! symbols, arrays, associations, classes and compiled methods. Test
//! programs park their results in an Association literal so assertions
//! go through the public memory API alone.

#![allow(dead_code)]

use st80_vm::consts::*;
use st80_vm::host::HeadlessHost;
use st80_vm::interpreter::Interpreter;
use st80_vm::memory::{self, ObjectMemory};

/// Instance-spec word for a plain pointer class with `fixed` fields.
pub fn pointer_spec(fixed: u16) -> u16 {
    0x8000 | (fixed << 1) | 1
}

pub struct Universe {
    pub memory: ObjectMemory,
    /// Class of `nil`, for wiring UndefinedObject methods.
    pub undefined_object_class: Oop,
}

impl Universe {
    pub fn new() -> Self {
        let mut memory = ObjectMemory::new();

        // every reserved OOP becomes a live pointer object so field
        // access works; classes get {superclass, messageDict, spec}
        for oop in (NIL..=LAST_WELL_KNOWN).step_by(2) {
            memory.install_object((oop >> 1) as usize, CLASS_ARRAY, &[0u8; 6], false, true);
        }
        // the special-selector array holds 32 (selector, count) pairs
        memory.install_object(
            (SPECIAL_SELECTORS >> 1) as usize,
            CLASS_ARRAY,
            &vec![0u8; 64 * 2],
            false,
            true,
        );

        let mut universe = Self {
            memory,
            undefined_object_class: NIL,
        };

        let undefined = universe.class(pointer_spec(0), &[]);
        universe.undefined_object_class = undefined;
        universe.set_class_of(NIL, undefined);

        universe
    }

    /// Point an installed object's slot at a different class.
    pub fn set_class_of(&mut self, oop: Oop, class: Oop) {
        let bytes: Vec<u8> = (0..self.memory.word_length_of(oop))
            .map(|i| self.memory.fetch_word(i, oop).unwrap())
            .flat_map(|w| w.to_be_bytes())
            .collect();
        let pointers = self.memory.has_pointer_members(oop);
        self.memory
            .install_object((oop >> 1) as usize, class, &bytes, false, pointers);
    }

    pub fn symbol(&mut self, text: &str) -> Oop {
        let oop = self
            .memory
            .instantiate_with_bytes(CLASS_SYMBOL, text.len())
            .unwrap();
        for (index, byte) in text.bytes().enumerate() {
            self.memory.store_byte(index, oop, byte).unwrap();
        }
        oop
    }

    pub fn array(&mut self, elements: &[Oop]) -> Oop {
        let oop = self
            .memory
            .instantiate_with_pointers(CLASS_ARRAY, elements.len())
            .unwrap();
        for (index, element) in elements.iter().enumerate() {
            self.memory.store_pointer(index, oop, *element).unwrap();
        }
        oop
    }

    /// An Association used as a result mailbox for test programs.
    pub fn association(&mut self) -> Oop {
        let oop = self
            .memory
            .instantiate_with_pointers(CLASS_ARRAY, 2)
            .unwrap();
        self.memory
            .store_pointer(ASSOCIATION_VALUE, oop, NIL)
            .unwrap();
        oop
    }

    pub fn association_value(&self, association: Oop) -> Oop {
        self.memory
            .fetch_pointer(ASSOCIATION_VALUE, association)
            .unwrap()
    }

    /// A class object: {superclass, messageDict, spec} with a method
    /// dictionary built from (selector, method) pairs.
    pub fn class(&mut self, spec: u16, methods: &[(Oop, Oop)]) -> Oop {
        let class = self
            .memory
            .instantiate_with_pointers(CLASS_ARRAY, 3)
            .unwrap();
        self.fill_class(class, spec, methods);
        class
    }

    /// Populate one of the reserved class OOPs in place.
    pub fn fill_class(&mut self, class: Oop, spec: u16, methods: &[(Oop, Oop)]) {
        let dictionary = self
            .memory
            .instantiate_with_pointers(
                CLASS_METHOD_DICTIONARY,
                method_dict::SELECTOR_START + methods.len(),
            )
            .unwrap();
        let values: Vec<Oop> = methods.iter().map(|(_, method)| *method).collect();
        let method_array = self.array(&values);
        self.memory
            .store_pointer(method_dict::METHOD_ARRAY, dictionary, method_array)
            .unwrap();
        for (index, (selector, _)) in methods.iter().enumerate() {
            self.memory
                .store_pointer(method_dict::SELECTOR_START + index, dictionary, *selector)
                .unwrap();
        }

        self.memory
            .store_pointer(class::SUPERCLASS, class, NIL)
            .unwrap();
        self.memory
            .store_pointer(class::MESSAGE_DICT, class, dictionary)
            .unwrap();
        self.memory
            .store_word(class::INSTANCE_SPEC, class, spec | 1)
            .unwrap();
    }

    /// A CompiledMethod with a plain header (no primitive).
    pub fn method(&mut self, arguments: u8, temporaries: u8, literals: &[Oop], bytecodes: &[u8]) -> Oop {
        assert!(arguments <= 4);
        let byte_len = 2 + literals.len() * 2 + bytecodes.len();
        let method = self
            .memory
            .instantiate_with_bytes(CLASS_COMPILED_METHOD, byte_len)
            .unwrap();
        self.memory
            .store_byte(0, method, (arguments << 5) | (temporaries & 0x1f))
            .unwrap();
        self.memory
            .store_byte(1, method, (literals.len() as u8) << 1)
            .unwrap();
        for (index, literal) in literals.iter().enumerate() {
            self.memory.store_word(1 + index, method, *literal).unwrap();
        }
        let base = 2 + literals.len() * 2;
        for (index, byte) in bytecodes.iter().enumerate() {
            self.memory.store_byte(base + index, method, *byte).unwrap();
        }
        method
    }

    /// A CompiledMethod whose header extension names a primitive. The
    /// extension and the method-class association are appended to the
    /// literal frame, as the compiler lays them out.
    pub fn primitive_method(
        &mut self,
        primitive: u8,
        arguments: u8,
        literals: &[Oop],
        bytecodes: &[u8],
    ) -> Oop {
        let extension = ((arguments as u16) << 9) | ((primitive as u16) << 1) | 1;
        let mut all = literals.to_vec();
        all.push(extension);
        all.push(NIL);
        let method = self.method(0, 0, &all, bytecodes);
        // flag 7 marks the header extension
        self.memory.store_byte(0, method, 7 << 5).unwrap();
        method
    }

    /// Register a (selector, argument count) pair for one of the
    /// special-selector bytecodes 176..=207.
    pub fn special_selector(&mut self, offset: usize, selector: Oop, count: i16) {
        self.memory
            .store_pointer(offset * 2, SPECIAL_SELECTORS, selector)
            .unwrap();
        self.memory
            .store_word(offset * 2 + 1, SPECIAL_SELECTORS, memory::from_int(count.into()).unwrap())
            .unwrap();
    }

    /// A suspended MethodContext ready to run `method` against
    /// `receiver`.
    pub fn context(&mut self, method: Oop, receiver: Oop) -> Oop {
        let context = self
            .memory
            .instantiate_with_pointers(
                CLASS_METHOD_CONTEXT,
                method_context::TEMP_FRAME_START + SMALL_FRAME,
            )
            .unwrap();
        self.memory
            .store_pointer(method_context::SENDER, context, NIL)
            .unwrap();
        let initial = self
            .memory
            .method_initial_instruction_pointer(method)
            .unwrap();
        self.memory
            .store_word(
                method_context::INSTRUCTION_POINTER,
                context,
                memory::from_int(initial.into()).unwrap(),
            )
            .unwrap();
        let temporaries = self.memory.method_temporary_count(method).unwrap();
        self.memory
            .store_word(
                method_context::STACK_POINTER,
                context,
                memory::from_int(temporaries.into()).unwrap(),
            )
            .unwrap();
        self.memory
            .store_pointer(method_context::METHOD, context, method)
            .unwrap();
        self.memory
            .store_pointer(method_context::RECEIVER, context, receiver)
            .unwrap();
        context
    }

    /// Wire the ProcessorScheduler so `initialize` finds `context`
    /// suspended in the active process.
    pub fn schedule(&mut self, context: Oop) {
        let process = self
            .memory
            .instantiate_with_pointers(CLASS_ARRAY, 4)
            .unwrap();
        self.memory
            .store_pointer(process::SUSPENDED_CONTEXT, process, context)
            .unwrap();
        self.memory
            .store_pointer(process::PRIORITY, process, memory::from_int(4).unwrap())
            .unwrap();

        let lists: Vec<Oop> = (0..8)
            .map(|_| {
                self.memory
                    .instantiate_with_pointers(CLASS_ARRAY, 2)
                    .unwrap()
            })
            .collect();
        let process_lists = self.array(&lists);

        let scheduler = self
            .memory
            .instantiate_with_pointers(CLASS_ARRAY, 2)
            .unwrap();
        self.memory
            .store_pointer(scheduler::PROCESS_LISTS, scheduler, process_lists)
            .unwrap();
        self.memory
            .store_pointer(scheduler::ACTIVE_PROCESS, scheduler, process)
            .unwrap();
        self.memory
            .store_pointer(ASSOCIATION_VALUE, PROCESSOR_ASSOCIATION, scheduler)
            .unwrap();
    }

    /// Boot an interpreter on `method` and run it for `cycles` steps.
    pub fn run(mut self, method: Oop, receiver: Oop, cycles: usize) -> Interpreter<HeadlessHost> {
        let context = self.context(method, receiver);
        self.schedule(context);
        let mut vm = Interpreter::new(self.memory, HeadlessHost::new());
        vm.initialize().expect("universe boots");
        for _ in 0..cycles {
            vm.cycle().expect("cycle runs");
        }
        vm
    }
}

/// Descriptor byte for the extended store bytecodes: kind 3 (literal
/// variable), index 0.
pub const STORE_LITERAL0: u8 = 0b1100_0000;

/// Long unconditional jump back to the jump's own first byte.
pub const LOOP_FOREVER: [u8; 2] = [163, 254];
