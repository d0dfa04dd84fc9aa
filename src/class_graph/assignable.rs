use super::ClassId;
use crate::names::BinaryName;
use crate::util::RefId;
use std::collections::HashSet;

/// Subtyping relationship between types
pub trait Assignable {
    /// Is the first type assignable to the second?
    fn is_assignable(&self, super_type: &Self) -> bool;
}

/// This does a traversal of super types in the class graph to determine assignability
impl<'g> Assignable for ClassId<'g> {
    fn is_assignable(&self, super_type: &ClassId<'g>) -> bool {
        let mut supertypes_to_visit: Vec<ClassId<'g>> = vec![*self];
        let mut dont_revisit: HashSet<ClassId<'g>> = HashSet::new();
        dont_revisit.insert(*self);

        // Optimization: if the super type is a class, then skip visiting interfaces
        let super_is_class: bool = !super_type.is_interface();

        while let Some(class_data) = supertypes_to_visit.pop() {
            if class_data == *super_type {
                return true;
            }
            let class_data = class_data.0;

            // Enqueue next types to visit
            if let Some(superclass) = class_data.superclass {
                if dont_revisit.insert(superclass) {
                    supertypes_to_visit.push(superclass);
                }
            }
            if !super_is_class {
                for interface in &class_data.interfaces {
                    let interface = RefId(interface);
                    if dont_revisit.insert(interface) {
                        supertypes_to_visit.push(interface);
                    }
                }
            }
        }

        false
    }
}

/// Check if arrays can be assigned to a super type
///
/// This bakes in knowledge of the small, finite set of super types arrays have.
pub(crate) fn is_array_type_assignable(super_type: &BinaryName) -> bool {
    super_type == &BinaryName::OBJECT
        || super_type == &BinaryName::CLONEABLE
        || super_type == &BinaryName::SERIALIZABLE
}

#[cfg(test)]
mod test {
    use super::is_array_type_assignable;
    use crate::access_flags::ClassAccessFlags;
    use crate::class_graph::{Assignable, ClassData, ClassGraph, ClassGraphArenas};
    use crate::names::{BinaryName, Name};

    #[test]
    fn simple_classes() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();

        let object_cls = &java.object;
        let string_cls = &java.string;

        assert!(
            object_cls.is_assignable(object_cls),
            "java.lang.Object <: java.lang.Object"
        );
        assert!(
            string_cls.is_assignable(string_cls),
            "java.lang.String <: java.lang.String"
        );
        assert!(
            string_cls.is_assignable(object_cls),
            "java.lang.String <: java.lang.Object"
        );
        assert!(
            !object_cls.is_assignable(string_cls),
            "java.lang.Object </: java.lang.String"
        );
    }

    #[test]
    fn transitive_classes() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();

        let object_cls = &java.object;
        let number_cls = &java.number;
        let integer_cls = &java.integer;

        assert!(
            number_cls.is_assignable(object_cls),
            "java.lang.Number <: java.lang.Object"
        );
        assert!(
            integer_cls.is_assignable(number_cls),
            "java.lang.Integer <: java.lang.Number"
        );
        assert!(
            integer_cls.is_assignable(object_cls),
            "java.lang.Integer <: java.lang.Object"
        );

        assert!(
            !object_cls.is_assignable(number_cls),
            "java.lang.Object </: java.lang.Number"
        );
        assert!(
            !number_cls.is_assignable(integer_cls),
            "java.lang.Number </: java.lang.Integer"
        );
        assert!(
            !object_cls.is_assignable(integer_cls),
            "java.lang.Object </: java.lang.Integer"
        );
    }

    #[test]
    fn simple_interfaces() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();

        let object_cls = &java.object;
        let string_cls = &java.string;
        let charsequence_cls = &java.char_sequence;

        assert!(
            string_cls.is_assignable(charsequence_cls),
            "java.lang.String <: java.lang.CharSequence"
        );
        assert!(
            charsequence_cls.is_assignable(object_cls),
            "java.lang.CharSequence <: java.lang.Object"
        );
        assert!(
            !charsequence_cls.is_assignable(string_cls),
            "java.lang.CharSequence </: java.lang.String"
        );
        assert!(
            !object_cls.is_assignable(charsequence_cls),
            "java.lang.Object </: java.lang.CharSequence"
        );
    }

    #[test]
    fn inherited_interfaces() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();

        // Text extends String (hypothetically), so it picks up CharSequence
        // through the superclass edge.
        let text = class_graph.add_class(ClassData::new(
            BinaryName::from_string("com/example/Text".to_string()).unwrap(),
            java.string,
            ClassAccessFlags::SUPER | ClassAccessFlags::PUBLIC,
        ));

        assert!(
            text.is_assignable(&java.char_sequence),
            "com.example.Text <: java.lang.CharSequence"
        );
        assert!(
            text.is_assignable(&java.object),
            "com.example.Text <: java.lang.Object"
        );
        assert!(
            !java.string.is_assignable(&text),
            "java.lang.String </: com.example.Text"
        );
    }

    #[test]
    fn array_super_types() {
        assert!(is_array_type_assignable(&BinaryName::OBJECT));
        assert!(is_array_type_assignable(&BinaryName::CLONEABLE));
        assert!(is_array_type_assignable(&BinaryName::SERIALIZABLE));
        assert!(!is_array_type_assignable(&BinaryName::STRING));
        assert!(!is_array_type_assignable(&BinaryName::THROWABLE));
    }
}
