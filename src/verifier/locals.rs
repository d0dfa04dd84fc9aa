use super::{MethodInfo, Operand, StackFrame};
use crate::class_graph::ClassGraph;
use crate::errors::VerifyErrorKind;
use crate::util::Width;
use std::collections::BTreeSet;

/// Local variable half of a frame
///
/// The array always has the method's `max_locals` length. A wide value stored at index `i` owns
/// slots `i` and `i + 1`, with the second slot pinned to [`Operand::Invalid`] so that nothing can
/// read half of a `long` or `double`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Locals {
    pub(crate) slots: Vec<Operand>,
}

impl Locals {
    /// Initial locals for a method entry frame
    ///
    /// Instance methods get their receiver in slot 0. In a constructor the receiver starts out as
    /// [`Operand::UninitializedThis`] and stays that way until the superclass constructor has
    /// run. Parameters follow, each wide parameter claiming two slots, and the remaining slots up
    /// to `max_locals` start out [`Operand::Invalid`].
    pub fn for_method(method: &MethodInfo, max_locals: usize) -> Result<Locals, VerifyErrorKind> {
        let mut slots: Vec<Operand> = vec![];

        if !method.is_static() {
            if method.is_constructor() {
                slots.push(Operand::UninitializedThis(method.class.clone()));
            } else {
                slots.push(Operand::object(method.class.clone()));
            }
        }

        for parameter in &method.descriptor.parameters {
            let operand = Operand::from(parameter.clone());
            let width = operand.width();
            slots.push(operand);
            if width == 2 {
                slots.push(Operand::Invalid);
            }
        }

        if slots.len() > max_locals {
            return Err(VerifyErrorKind::InvalidLocalIndex(slots.len() - 1));
        }
        slots.resize(max_locals, Operand::Invalid);

        Ok(Locals { slots })
    }

    /// Number of slots (the method's `max_locals`)
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate over the slots, including padding and unused ones
    pub fn iter(&self) -> std::slice::Iter<'_, Operand> {
        self.slots.iter()
    }

    fn get(&self, index: usize) -> Result<&Operand, VerifyErrorKind> {
        self.slots
            .get(index)
            .ok_or(VerifyErrorKind::InvalidLocalIndex(index))
    }

    /// Load a value which must comply with the expected type
    ///
    /// Loading a wide type also checks that the second slot still holds the padding, since a
    /// store to `index + 1` would have destroyed the upper half of the value.
    pub fn load<'g>(
        &self,
        index: usize,
        expected: &Operand,
        types: &'g ClassGraph<'g>,
    ) -> Result<Operand, VerifyErrorKind> {
        let found = self.get(index)?;
        if !found.complies_with(expected, types) {
            return Err(if found.is_uninitialized() {
                VerifyErrorKind::UninitializedUse(found.clone())
            } else {
                VerifyErrorKind::IncompatibleTypes(found.clone(), expected.clone())
            });
        }

        if expected.width() == 2 {
            let padding = self.get(index + 1)?;
            if *padding != Operand::Invalid {
                return Err(VerifyErrorKind::InvalidWidth(padding.width()));
            }
        }

        Ok(found.clone())
    }

    /// Load a value which must be a reference (an uninitialized reference is still a reference)
    pub fn load_reference(&self, index: usize) -> Result<Operand, VerifyErrorKind> {
        let found = self.get(index)?;
        if found.is_reference() {
            Ok(found.clone())
        } else {
            Err(VerifyErrorKind::IncompatibleTypes(
                found.clone(),
                Operand::AnyObject,
            ))
        }
    }

    /// Load a `ret` target, which must be a return address
    pub fn load_return_address(&self, index: usize) -> Result<Operand, VerifyErrorKind> {
        let found = self.get(index)?;
        match found {
            Operand::ReturnAddress(_) => Ok(found.clone()),
            _ => Err(VerifyErrorKind::IncompatibleTypes(
                found.clone(),
                Operand::ReturnAddress(BTreeSet::new()),
            )),
        }
    }

    /// Store a value, maintaining the padding invariants
    ///
    /// Storing over the padding slot of a wide value invalidates the whole value, and storing a
    /// wide value pins `index + 1` to [`Operand::Invalid`].
    pub fn store(&mut self, index: usize, operand: Operand) -> Result<(), VerifyErrorKind> {
        let width = operand.width();
        if index + width > self.slots.len() {
            return Err(VerifyErrorKind::InvalidLocalIndex(index + width - 1));
        }

        // A wide value at `index - 1` just lost its upper half
        if index > 0 && self.slots[index - 1].width() == 2 {
            self.slots[index - 1] = Operand::Invalid;
        }

        self.slots[index] = operand;
        if width == 2 {
            self.slots[index + 1] = Operand::Invalid;
        }
        Ok(())
    }

    /// Check these locals against the ones in a recorded frame
    ///
    /// Returns the first slot holding a value that does not comply with the recorded one, or
    /// `None` when every slot complies. Unlike stacks, locals of conflicting types are never a
    /// hard failure: the merge just forgets the slot.
    pub fn merge_into<'g>(
        &self,
        recorded: &StackFrame,
        types: &'g ClassGraph<'g>,
    ) -> Option<usize> {
        self.iter()
            .zip(recorded.locals().iter())
            .position(|(found, expected)| !found.complies_with_in_merge(expected, types))
    }

    /// Replace every occurrence of an uninitialized type with its initialized form
    pub fn initialize_uninitialized(&mut self, original: &Operand, updated: &Operand) {
        for slot in self.slots.iter_mut() {
            if *slot == *original {
                *slot = updated.clone();
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::access_flags::MethodAccessFlags;
    use crate::class_graph::ClassGraphArenas;
    use crate::descriptors::{MethodDescriptor, ParseDescriptor};
    use crate::names::{BinaryName, Name, UnqualifiedName};
    use crate::util::Offset;
    use crate::verifier::OperandStack;

    fn method(
        name: UnqualifiedName,
        descriptor: &str,
        access_flags: MethodAccessFlags,
    ) -> MethodInfo {
        MethodInfo {
            class: BinaryName::from_string("com/example/Widget".to_string()).unwrap(),
            name,
            descriptor: MethodDescriptor::parse(descriptor).unwrap(),
            access_flags,
        }
    }

    #[test]
    fn constructor_receiver_starts_uninitialized() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_java_library_types();

        let constructor = method(UnqualifiedName::INIT, "()V", MethodAccessFlags::PUBLIC);
        let locals = Locals::for_method(&constructor, 1).unwrap();

        let err = locals
            .load(0, &Operand::object(constructor.class.clone()), &class_graph)
            .unwrap_err();
        assert!(
            matches!(err, VerifyErrorKind::UninitializedUse(Operand::UninitializedThis(_))),
            "the receiver is not constructed yet"
        );

        assert_eq!(
            locals.load_reference(0).unwrap(),
            Operand::UninitializedThis(constructor.class),
        );
    }

    #[test]
    fn instance_method_receiver_is_initialized() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_java_library_types();

        let frob = method(
            UnqualifiedName::from_string("frob".to_string()).unwrap(),
            "(I)V",
            MethodAccessFlags::PUBLIC,
        );
        let locals = Locals::for_method(&frob, 3).unwrap();

        assert_eq!(
            locals.load(0, &Operand::object(frob.class.clone()), &class_graph).unwrap(),
            Operand::object(frob.class),
        );
        assert_eq!(
            locals.load(1, &Operand::Integer, &class_graph).unwrap(),
            Operand::Integer,
        );
        assert_eq!(
            locals.load(2, &Operand::Invalid, &class_graph).unwrap(),
            Operand::Invalid,
            "unused slots hold no usable value"
        );
    }

    #[test]
    fn static_method_has_no_receiver() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_java_library_types();

        let hash = method(
            UnqualifiedName::from_string("hash".to_string()).unwrap(),
            "(JLjava/lang/String;)V",
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
        );
        let locals = Locals::for_method(&hash, 3).unwrap();

        assert_eq!(locals.len(), 3);
        assert_eq!(locals.load(0, &Operand::Long, &class_graph).unwrap(), Operand::Long);
        assert_eq!(
            locals.load(2, &Operand::object(BinaryName::STRING), &class_graph).unwrap(),
            Operand::object(BinaryName::STRING),
        );
    }

    #[test]
    fn parameters_overflowing_max_locals_fail() {
        let wide = method(
            UnqualifiedName::from_string("wide".to_string()).unwrap(),
            "(DD)V",
            MethodAccessFlags::STATIC,
        );
        let err = Locals::for_method(&wide, 3).unwrap_err();
        assert!(matches!(err, VerifyErrorKind::InvalidLocalIndex(3)));

        assert!(Locals::for_method(&wide, 4).is_ok());
    }

    #[test]
    fn storing_over_wide_padding_invalidates_the_value() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_java_library_types();

        let empty = method(
            UnqualifiedName::from_string("empty".to_string()).unwrap(),
            "()V",
            MethodAccessFlags::STATIC,
        );
        let mut locals = Locals::for_method(&empty, 3).unwrap();

        locals.store(0, Operand::Long).unwrap();
        assert_eq!(locals.load(0, &Operand::Long, &class_graph).unwrap(), Operand::Long);

        locals.store(1, Operand::Integer).unwrap();
        let err = locals.load(0, &Operand::Long, &class_graph).unwrap_err();
        assert!(
            matches!(err, VerifyErrorKind::IncompatibleTypes(Operand::Invalid, Operand::Long)),
            "overwriting the upper half destroys the long"
        );
        assert_eq!(
            locals.load(1, &Operand::Integer, &class_graph).unwrap(),
            Operand::Integer,
        );
    }

    #[test]
    fn loading_a_wide_value_checks_its_padding() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_java_library_types();

        let locals = Locals {
            slots: vec![Operand::Long, Operand::Integer],
        };
        let err = locals.load(0, &Operand::Long, &class_graph).unwrap_err();
        assert!(matches!(err, VerifyErrorKind::InvalidWidth(1)));
    }

    #[test]
    fn out_of_range_accesses_fail() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_java_library_types();

        let mut locals = Locals {
            slots: vec![Operand::Integer],
        };

        let err = locals.load(5, &Operand::Integer, &class_graph).unwrap_err();
        assert!(matches!(err, VerifyErrorKind::InvalidLocalIndex(5)));

        let err = locals.store(1, Operand::Integer).unwrap_err();
        assert!(matches!(err, VerifyErrorKind::InvalidLocalIndex(1)));

        let err = locals.store(0, Operand::Double).unwrap_err();
        assert!(
            matches!(err, VerifyErrorKind::InvalidLocalIndex(1)),
            "a wide store needs the padding slot too"
        );
    }

    #[test]
    fn return_addresses_only_come_from_return_address_slots() {
        let locals = Locals {
            slots: vec![
                Operand::ReturnAddress([Offset(10)].into_iter().collect()),
                Operand::Integer,
            ],
        };

        assert_eq!(
            locals.load_return_address(0).unwrap(),
            Operand::ReturnAddress([Offset(10)].into_iter().collect()),
        );
        assert!(matches!(
            locals.load_return_address(1),
            Err(VerifyErrorKind::IncompatibleTypes(
                Operand::Integer,
                Operand::ReturnAddress(_),
            )),
        ));
    }

    #[test]
    fn merge_into_reports_the_first_divergent_slot() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_java_library_types();

        let recorded = StackFrame::capture(
            Offset(10),
            &OperandStack::new(0),
            &Locals {
                slots: vec![Operand::Integer, Operand::object(BinaryName::OBJECT)],
            },
        );

        let complying = Locals {
            slots: vec![Operand::Integer, Operand::object(BinaryName::STRING)],
        };
        assert_eq!(complying.merge_into(&recorded, &class_graph), None);

        let divergent = Locals {
            slots: vec![Operand::Float, Operand::object(BinaryName::STRING)],
        };
        assert_eq!(divergent.merge_into(&recorded, &class_graph), Some(0));
    }

    #[test]
    fn initialize_uninitialized_rewrites_matching_slots() {
        let class = BinaryName::from_string("com/example/Widget".to_string()).unwrap();
        let uninit = Operand::UninitializedThis(class.clone());
        let mut locals = Locals {
            slots: vec![uninit.clone(), Operand::Integer, uninit.clone()],
        };

        locals.initialize_uninitialized(&uninit, &Operand::object(class.clone()));
        assert_eq!(
            locals.slots,
            vec![
                Operand::object(class.clone()),
                Operand::Integer,
                Operand::object(class),
            ],
        );
    }
}
