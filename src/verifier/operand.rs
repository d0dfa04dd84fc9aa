use crate::class_graph::{is_array_type_assignable, Assignable, ClassGraph, ClassId};
use crate::descriptors::{ArrayType, BaseType, FieldType, RefType};
use crate::errors::VerifyErrorKind;
use crate::names::BinaryName;
use crate::util::{Offset, Width};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Type of a value, as the verifier sees it
///
/// These types are from [this hierarchy][0], slightly augmented. `AnyObject` stands for a
/// reference whose class could not be pinned down, while `Invalid` marks slots that hold nothing
/// usable (the second slot of a 64-bit value, or a local clobbered by conflicting control flow
/// paths).
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.10.1.2
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum Operand {
    Integer,
    Float,
    Double,
    Long,
    Null,

    /// In a constructor, the `this` parameter starts with this type, then turns into an object
    /// type once another constructor has been called on it
    UninitializedThis(BinaryName),

    /// Object type
    Object(RefType),

    /// Reference whose class is statically unknown
    ///
    /// Every initialized reference complies with this, and merging it with any other reference
    /// yields it back.
    AnyObject,

    /// State of an object after `new` has been called but `<init>` has not
    Uninitialized(UninitializedRefType),

    /// Address pushed by a subroutine call, holding every offset the subroutine was entered from
    ReturnAddress(BTreeSet<Offset>),

    /// Unusable slot
    Invalid,
}

/// After a `new` instruction, the top of the stack holds an uninitialized value. The class that
/// value will have once constructed is not enough to identify it: two `new` instructions of the
/// same class produce values that must be initialized separately. Carrying the offset of the
/// `new` instruction makes equality on this type creation-site identity.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct UninitializedRefType {
    /// Once the value is initialized, what class will it be?
    pub class: BinaryName,

    /// Offset of the `new` instruction that produced the value
    pub offset: Offset,
}

impl Width for Operand {
    fn width(&self) -> usize {
        match self {
            Operand::Double | Operand::Long => 2,
            _ => 1,
        }
    }
}

impl Operand {
    /// Plain (zero-dimension) class reference
    pub const fn object(class_name: BinaryName) -> Operand {
        Operand::Object(RefType::Object(class_name))
    }

    /// Is this type a reference type?
    pub fn is_reference(&self) -> bool {
        match self {
            Operand::Integer
            | Operand::Float
            | Operand::Double
            | Operand::Long
            | Operand::ReturnAddress(_)
            | Operand::Invalid => false,

            Operand::Null
            | Operand::UninitializedThis(_)
            | Operand::Object(_)
            | Operand::AnyObject
            | Operand::Uninitialized(_) => true,
        }
    }

    /// Is this a reference on which no constructor has run yet?
    pub fn is_uninitialized(&self) -> bool {
        matches!(
            self,
            Operand::UninitializedThis(_) | Operand::Uninitialized(_)
        )
    }

    /// Type this operand will have once its constructor has run
    ///
    /// `None` for anything that is not an uninitialized reference.
    pub fn initialized(&self) -> Option<Operand> {
        match self {
            Operand::UninitializedThis(class) => Some(Operand::object(class.clone())),
            Operand::Uninitialized(uninit) => Some(Operand::object(uninit.class.clone())),
            _ => None,
        }
    }

    /// Can a value of this type be used where a value of the `target` type is required?
    ///
    /// This is the check behind popping typed operands and reading typed locals. It is
    /// deliberately asymmetric (`Null` complies with any object type, but not the other way
    /// around) and it is lenient with names the class graph cannot resolve: such a requirement is
    /// treated as satisfied, the same way interface requirements are. Resolution is only ever
    /// mandatory when merging (see [`Operand::merge_with`]).
    pub fn complies_with<'g>(&self, target: &Operand, types: &'g ClassGraph<'g>) -> bool {
        match (self, target) {
            (Operand::Integer, Operand::Integer)
            | (Operand::Float, Operand::Float)
            | (Operand::Long, Operand::Long)
            | (Operand::Double, Operand::Double) => true,

            // Uninitialized values satisfy no requirement; they are only ever consumed by the
            // constructor call for their own creation site
            (Operand::UninitializedThis(_) | Operand::Uninitialized(_), _) => false,

            // `Invalid` as a requirement demands nothing
            (_, Operand::Invalid) => true,

            (Operand::Null, Operand::Null | Operand::Object(_) | Operand::AnyObject) => true,

            (Operand::Object(_) | Operand::AnyObject, Operand::AnyObject) => true,
            (Operand::Object(found), Operand::Object(expected)) => {
                ref_complies(found, expected, types)
            }

            (Operand::ReturnAddress(found), Operand::ReturnAddress(expected)) => {
                found.is_subset(expected)
            }

            _ => false,
        }
    }

    /// Variant of [`Operand::complies_with`] used when checking a frame against a recorded one
    ///
    /// Uninitialized types are interchangeable only with themselves (the recorded frame must pin
    /// down the same creation site), and a recorded `Invalid` slot absorbs anything.
    pub fn complies_with_in_merge<'g>(&self, target: &Operand, types: &'g ClassGraph<'g>) -> bool {
        match (self, target) {
            (_, Operand::Invalid) => true,
            (Operand::UninitializedThis(_) | Operand::Uninitialized(_), _) => self == target,
            (_, Operand::UninitializedThis(_) | Operand::Uninitialized(_)) => false,
            _ => self.complies_with(target, types),
        }
    }

    /// Smallest type that values of both input types can be used as
    ///
    /// `Ok(None)` means the two types have no common shape at all (eg. a float and a reference).
    /// The caller decides whether that is fatal: it is on the operand stack, while a local
    /// variable slot just becomes [`Operand::Invalid`]. Merging object types is the one place
    /// where symbolic class names must actually resolve, since finding a common superclass means
    /// walking the hierarchy.
    pub fn merge_with<'g>(
        &self,
        other: &Operand,
        types: &'g ClassGraph<'g>,
    ) -> Result<Option<Operand>, VerifyErrorKind> {
        if self == other {
            return Ok(Some(self.clone()));
        }

        let merged = match (self, other) {
            (Operand::Null, Operand::Object(_) | Operand::AnyObject) => Some(other.clone()),
            (Operand::Object(_) | Operand::AnyObject, Operand::Null) => Some(self.clone()),

            (Operand::AnyObject, Operand::Object(_)) | (Operand::Object(_), Operand::AnyObject) => {
                Some(Operand::AnyObject)
            }

            (Operand::Object(ref1), Operand::Object(ref2)) => {
                Some(Operand::Object(merge_ref(ref1, ref2, types)?))
            }

            (Operand::ReturnAddress(targets1), Operand::ReturnAddress(targets2)) => {
                Some(Operand::ReturnAddress(targets1 | targets2))
            }

            _ => None,
        };
        Ok(merged)
    }
}

/// Narrow primitive types all live on the stack as `int`
impl From<FieldType> for Operand {
    fn from(field_type: FieldType) -> Operand {
        match field_type {
            FieldType::Base(BaseType::Int)
            | FieldType::Base(BaseType::Char)
            | FieldType::Base(BaseType::Short)
            | FieldType::Base(BaseType::Byte)
            | FieldType::Base(BaseType::Boolean) => Operand::Integer,
            FieldType::Base(BaseType::Float) => Operand::Float,
            FieldType::Base(BaseType::Long) => Operand::Long,
            FieldType::Base(BaseType::Double) => Operand::Double,
            FieldType::Ref(ref_type) => Operand::Object(ref_type),
        }
    }
}

fn ref_complies<'g>(found: &RefType, expected: &RefType, types: &'g ClassGraph<'g>) -> bool {
    match (found, expected) {
        (RefType::Object(found_class), RefType::Object(expected_class)) => {
            class_complies(found_class, expected_class, types)
        }

        // Arrays have a small fixed set of non-array super types
        (RefType::ObjectArray(_) | RefType::PrimitiveArray(_), RefType::Object(expected_class)) => {
            match types.lookup_class(expected_class) {
                None => true,
                Some(class) => class.is_interface() || expected_class == &BinaryName::OBJECT,
            }
        }

        (RefType::ObjectArray(found_arr), RefType::ObjectArray(expected_arr)) => {
            match found_arr
                .additional_dimensions
                .cmp(&expected_arr.additional_dimensions)
            {
                Ordering::Less => false,
                Ordering::Equal => class_complies(
                    &found_arr.element_type,
                    &expected_arr.element_type,
                    types,
                ),
                // A deeper array is itself an array of arrays, and arrays only ever have the
                // fixed super types
                Ordering::Greater => is_array_type_assignable(&expected_arr.element_type),
            }
        }

        (RefType::PrimitiveArray(found_arr), RefType::PrimitiveArray(expected_arr)) => {
            found_arr == expected_arr
        }

        (RefType::PrimitiveArray(found_arr), RefType::ObjectArray(expected_arr)) => {
            found_arr.additional_dimensions > expected_arr.additional_dimensions
                && is_array_type_assignable(&expected_arr.element_type)
        }

        (RefType::Object(_), RefType::ObjectArray(_) | RefType::PrimitiveArray(_))
        | (RefType::ObjectArray(_), RefType::PrimitiveArray(_)) => false,
    }
}

/// Compliance between two plain class names
///
/// An identical name, an unresolvable requirement, or an interface requirement is satisfied
/// without consulting the hierarchy (interface checks are deferred to invocation time, matching
/// the leniency of the JVM's own verifier). Everything else walks the class graph.
fn class_complies<'g>(
    found: &BinaryName,
    expected: &BinaryName,
    types: &'g ClassGraph<'g>,
) -> bool {
    if found == expected {
        return true;
    }
    let expected_class = match types.lookup_class(expected) {
        None => return true,
        Some(class) => class,
    };
    if expected_class.is_interface() {
        return true;
    }
    match types.lookup_class(found) {
        None => false,
        Some(found_class) => found_class.is_assignable(&expected_class),
    }
}

fn resolve_class<'g>(
    types: &'g ClassGraph<'g>,
    name: &BinaryName,
) -> Result<ClassId<'g>, VerifyErrorKind> {
    types
        .lookup_class(name)
        .ok_or_else(|| VerifyErrorKind::UnresolvedClass(name.clone()))
}

fn merge_ref<'g>(
    ref1: &RefType,
    ref2: &RefType,
    types: &'g ClassGraph<'g>,
) -> Result<RefType, VerifyErrorKind> {
    match (ref1, ref2) {
        (RefType::Object(class1), RefType::Object(class2)) => {
            let class1 = resolve_class(types, class1)?;
            let class2 = resolve_class(types, class2)?;
            let ancestor = ClassGraph::common_ancestor(class1, class2);
            Ok(RefType::Object(ancestor.name.clone()))
        }

        // The unified type of an array and a non-array is only more precise than
        // `java/lang/Object` when the non-array side is already an array super type
        (RefType::Object(class), RefType::ObjectArray(_) | RefType::PrimitiveArray(_))
        | (RefType::ObjectArray(_) | RefType::PrimitiveArray(_), RefType::Object(class)) => {
            if is_array_type_assignable(class) {
                Ok(RefType::Object(class.clone()))
            } else {
                Ok(RefType::Object(BinaryName::OBJECT))
            }
        }

        (RefType::ObjectArray(arr1), RefType::ObjectArray(arr2)) => {
            if arr1.additional_dimensions == arr2.additional_dimensions {
                let class1 = resolve_class(types, &arr1.element_type)?;
                let class2 = resolve_class(types, &arr2.element_type)?;
                let ancestor = ClassGraph::common_ancestor(class1, class2);
                Ok(RefType::ObjectArray(ArrayType {
                    additional_dimensions: arr1.additional_dimensions,
                    element_type: ancestor.name.clone(),
                }))
            } else {
                Ok(shallower_array_super(arr1, arr2))
            }
        }

        // Identical primitive arrays were handled before the merge started, so the elements (or
        // the dimensions) mismatch and only the object side of the lattice is left
        (RefType::PrimitiveArray(arr1), RefType::PrimitiveArray(arr2)) => {
            Ok(RefType::ObjectArray(ArrayType {
                additional_dimensions: arr1
                    .additional_dimensions
                    .min(arr2.additional_dimensions),
                element_type: BinaryName::OBJECT,
            }))
        }

        (RefType::PrimitiveArray(prim_arr), RefType::ObjectArray(obj_arr))
        | (RefType::ObjectArray(obj_arr), RefType::PrimitiveArray(prim_arr)) => {
            if obj_arr.additional_dimensions < prim_arr.additional_dimensions
                && is_array_type_assignable(&obj_arr.element_type)
            {
                Ok(RefType::ObjectArray(obj_arr.clone()))
            } else {
                Ok(RefType::ObjectArray(ArrayType {
                    additional_dimensions: obj_arr
                        .additional_dimensions
                        .min(prim_arr.additional_dimensions),
                    element_type: BinaryName::OBJECT,
                }))
            }
        }
    }
}

/// Unified type of two object arrays with different dimension counts
///
/// Viewed at the shallower array's depth, the deeper array's elements are themselves arrays, so
/// the shallower element type survives only if it is one of the fixed array super types.
fn shallower_array_super(arr1: &ArrayType<BinaryName>, arr2: &ArrayType<BinaryName>) -> RefType {
    let shallow = if arr1.additional_dimensions < arr2.additional_dimensions {
        arr1
    } else {
        arr2
    };
    if is_array_type_assignable(&shallow.element_type) {
        RefType::ObjectArray(shallow.clone())
    } else {
        RefType::ObjectArray(ArrayType {
            additional_dimensions: shallow.additional_dimensions,
            element_type: BinaryName::OBJECT,
        })
    }
}
