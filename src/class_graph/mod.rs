use crate::access_flags::ClassAccessFlags;
use crate::names::{BinaryName, Name};
use crate::util::RefId;
use elsa::map::FrozenMap;
use elsa::FrozenVec;
use std::collections::HashSet;
use std::fmt;
use std::fmt::Debug;
use typed_arena::Arena;

mod assignable;
mod java_classes;

pub use assignable::*;
pub use java_classes::*;

/// Reference to a class in the graph
///
/// Since classes are only ever added to the graph (never removed or mutated
/// in place), the reference itself works as a cheap identity.
pub type ClassId<'g> = RefId<'g, ClassData<'g>>;

pub struct ClassGraphArenas<'g> {
    class_arena: Arena<ClassData<'g>>,
}

impl<'g> ClassGraphArenas<'g> {
    pub fn new() -> Self {
        ClassGraphArenas {
            class_arena: Arena::new(),
        }
    }
}

/// Tracks the subtyping relationships between classes and interfaces
///
/// Checking and merging reference types both boil down to questions about the
/// class hierarchy, so all of those queries go through one unified graph.
/// Symbolic names that don't resolve here are not automatically an error:
/// the caller decides whether an unresolved name is acceptable (it usually is
/// when checking against a requirement, but never when computing a merge).
pub struct ClassGraph<'g> {
    arenas: &'g ClassGraphArenas<'g>,
    classes: FrozenMap<&'g BinaryName, &'g ClassData<'g>>,
}

impl<'g> ClassGraph<'g> {
    /// New empty graph
    pub fn new(arenas: &'g ClassGraphArenas<'g>) -> Self {
        ClassGraph {
            arenas,
            classes: FrozenMap::new(),
        }
    }

    /// Look up a class by its binary name
    pub fn lookup_class(&'g self, name: &BinaryName) -> Option<ClassId<'g>> {
        self.classes.get(name).map(RefId)
    }

    /// Add a new class to the class graph
    pub fn add_class(&self, data: ClassData<'g>) -> ClassId<'g> {
        let data = &*self.arenas.class_arena.alloc(data);
        self.classes.insert(&data.name, data);
        RefId(data)
    }

    /// Nearest class which is a superclass of both inputs
    ///
    /// This only ever walks superclass edges, so two types related through an
    /// interface still meet at `java/lang/Object` (interfaces themselves have
    /// `java/lang/Object` as their superclass). Since every chain ends at the
    /// root, the walk always produces an answer.
    pub fn common_ancestor(class1: ClassId<'g>, class2: ClassId<'g>) -> ClassId<'g> {
        let mut superclasses1: HashSet<ClassId<'g>> = HashSet::new();
        let mut next_class = Some(class1);
        while let Some(class) = next_class {
            superclasses1.insert(class);
            next_class = class.superclass;
        }

        let mut candidate = class2;
        loop {
            if superclasses1.contains(&candidate) {
                return candidate;
            }
            match candidate.superclass {
                Some(superclass) => candidate = superclass,
                None => return candidate,
            }
        }
    }

    /// Is this object type throwable?
    pub fn is_throwable(class: ClassId<'g>) -> bool {
        let mut next_class = Some(class);
        while let Some(class) = next_class {
            if class.name == BinaryName::THROWABLE {
                return true;
            }
            next_class = class.superclass;
        }

        false
    }

    /// Add standard types to the class graph
    pub fn insert_java_library_types(&self) -> JavaClasses<'g> {
        JavaClasses::add_to_graph(self)
    }
}

pub struct ClassData<'g> {
    /// Name of the class
    pub name: BinaryName,

    /// Superclass is only ever missing for `java/lang/Object` itself
    pub superclass: Option<ClassId<'g>>,

    /// Interfaces implemented (or super-interfaces)
    pub interfaces: FrozenVec<ClassId<'g>>,

    /// Class access flags
    pub access_flags: ClassAccessFlags,
}

impl<'g> ClassData<'g> {
    pub fn new(
        name: BinaryName,
        superclass: ClassId<'g>,
        access_flags: ClassAccessFlags,
    ) -> ClassData<'g> {
        ClassData {
            name,
            superclass: Some(superclass),
            interfaces: FrozenVec::new(),
            access_flags,
        }
    }

    /// Is this an interface?
    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }
}

impl<'g> PartialEq for ClassData<'g> {
    fn eq(&self, other: &ClassData<'g>) -> bool {
        self.name == other.name
    }
}

impl<'g> Eq for ClassData<'g> {}

impl<'g> Debug for ClassData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_str())
    }
}

#[cfg(test)]
mod test {
    use crate::access_flags::ClassAccessFlags;
    use crate::names::{BinaryName, Name};
    use super::{ClassData, ClassGraph, ClassGraphArenas};

    #[test]
    fn lookup_resolves_only_added_classes() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();

        assert_eq!(
            class_graph.lookup_class(&BinaryName::STRING),
            Some(java.string),
            "java.lang.String resolves to the added class"
        );

        let missing = BinaryName::from_string("com/example/Missing".to_string()).unwrap();
        assert_eq!(
            class_graph.lookup_class(&missing),
            None,
            "unknown names don't resolve"
        );
    }

    #[test]
    fn common_ancestor_of_classes() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();

        assert_eq!(
            ClassGraph::common_ancestor(java.integer, java.long),
            java.number,
            "Integer and Long meet at Number"
        );
        assert_eq!(
            ClassGraph::common_ancestor(java.integer, java.number),
            java.number,
            "a class meets its own superclass at that superclass"
        );
        assert_eq!(
            ClassGraph::common_ancestor(java.integer, java.string),
            java.object,
            "unrelated classes meet at Object"
        );
        assert_eq!(
            ClassGraph::common_ancestor(java.string, java.string),
            java.string,
            "a class meets itself at itself"
        );
    }

    #[test]
    fn common_ancestor_ignores_interface_edges() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();

        // String implements CharSequence, but the ancestor walk only follows
        // superclasses, so the two meet at Object.
        assert_eq!(
            ClassGraph::common_ancestor(java.string, java.char_sequence),
            java.object,
        );
    }

    #[test]
    fn throwable_chain() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();

        assert!(ClassGraph::is_throwable(java.throwable));
        assert!(ClassGraph::is_throwable(java.error));
        assert!(ClassGraph::is_throwable(java.arithmetic_exception));
        assert!(!ClassGraph::is_throwable(java.string));
        assert!(!ClassGraph::is_throwable(java.object));
    }

    #[test]
    fn user_classes_extend_the_graph() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();

        let widget_name = BinaryName::from_string("com/example/Widget".to_string()).unwrap();
        let widget = class_graph.add_class(ClassData::new(
            widget_name.clone(),
            java.object,
            ClassAccessFlags::SUPER | ClassAccessFlags::PUBLIC,
        ));

        assert_eq!(class_graph.lookup_class(&widget_name), Some(widget));
        assert_eq!(
            ClassGraph::common_ancestor(widget, java.string),
            java.object,
        );
    }
}
