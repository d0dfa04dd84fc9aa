use super::{ClassData, ClassGraph, ClassId};
use crate::access_flags::ClassAccessFlags;
use crate::names::BinaryName;
use elsa::FrozenVec;

/// Standard library classes which verification relies on
///
/// This covers the root of the hierarchy, the special super types of arrays,
/// the `Throwable` chain (for exception handler entry), and a handful of
/// common value classes that show up in tests and descriptors.
pub struct JavaClasses<'g> {
    pub object: ClassId<'g>,
    pub cloneable: ClassId<'g>,
    pub serializable: ClassId<'g>,
    pub char_sequence: ClassId<'g>,
    pub string: ClassId<'g>,
    pub number: ClassId<'g>,
    pub integer: ClassId<'g>,
    pub long: ClassId<'g>,
    pub float: ClassId<'g>,
    pub double: ClassId<'g>,
    pub throwable: ClassId<'g>,
    pub error: ClassId<'g>,
    pub exception: ClassId<'g>,
    pub runtime_exception: ClassId<'g>,
    pub arithmetic_exception: ClassId<'g>,
}

impl<'g> JavaClasses<'g> {
    pub fn add_to_graph(class_graph: &ClassGraph<'g>) -> JavaClasses<'g> {
        let object = class_graph.add_class(ClassData {
            name: BinaryName::OBJECT,
            superclass: None,
            interfaces: FrozenVec::new(),
            access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
        });

        let cloneable = class_graph.add_class(ClassData::new(
            BinaryName::CLONEABLE,
            object,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT,
        ));
        let serializable = class_graph.add_class(ClassData::new(
            BinaryName::SERIALIZABLE,
            object,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT,
        ));
        let char_sequence = class_graph.add_class(ClassData::new(
            BinaryName::CHARSEQUENCE,
            object,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT,
        ));
        let string = class_graph.add_class(ClassData::new(
            BinaryName::STRING,
            object,
            ClassAccessFlags::SUPER | ClassAccessFlags::PUBLIC | ClassAccessFlags::FINAL,
        ));
        let number = class_graph.add_class(ClassData::new(
            BinaryName::NUMBER,
            object,
            ClassAccessFlags::SUPER | ClassAccessFlags::PUBLIC | ClassAccessFlags::ABSTRACT,
        ));
        let integer = class_graph.add_class(ClassData::new(
            BinaryName::INTEGER,
            number,
            ClassAccessFlags::SUPER | ClassAccessFlags::PUBLIC | ClassAccessFlags::FINAL,
        ));
        let long = class_graph.add_class(ClassData::new(
            BinaryName::LONG,
            number,
            ClassAccessFlags::SUPER | ClassAccessFlags::PUBLIC | ClassAccessFlags::FINAL,
        ));
        let float = class_graph.add_class(ClassData::new(
            BinaryName::FLOAT,
            number,
            ClassAccessFlags::SUPER | ClassAccessFlags::PUBLIC | ClassAccessFlags::FINAL,
        ));
        let double = class_graph.add_class(ClassData::new(
            BinaryName::DOUBLE,
            number,
            ClassAccessFlags::SUPER | ClassAccessFlags::PUBLIC | ClassAccessFlags::FINAL,
        ));
        let throwable = class_graph.add_class(ClassData::new(
            BinaryName::THROWABLE,
            object,
            ClassAccessFlags::SUPER | ClassAccessFlags::PUBLIC,
        ));
        let error = class_graph.add_class(ClassData::new(
            BinaryName::ERROR,
            throwable,
            ClassAccessFlags::SUPER | ClassAccessFlags::PUBLIC,
        ));
        let exception = class_graph.add_class(ClassData::new(
            BinaryName::EXCEPTION,
            throwable,
            ClassAccessFlags::SUPER | ClassAccessFlags::PUBLIC,
        ));
        let runtime_exception = class_graph.add_class(ClassData::new(
            BinaryName::RUNTIMEEXCEPTION,
            exception,
            ClassAccessFlags::SUPER | ClassAccessFlags::PUBLIC,
        ));
        let arithmetic_exception = class_graph.add_class(ClassData::new(
            BinaryName::ARITHMETICEXCEPTION,
            runtime_exception,
            ClassAccessFlags::SUPER | ClassAccessFlags::PUBLIC,
        ));

        string.interfaces.push(char_sequence);
        string.interfaces.push(serializable);
        throwable.interfaces.push(serializable);

        JavaClasses {
            object,
            cloneable,
            serializable,
            char_sequence,
            string,
            number,
            integer,
            long,
            float,
            double,
            throwable,
            error,
            exception,
            runtime_exception,
            arithmetic_exception,
        }
    }
}
