//! Bytecode verification state
//!
//! For any specific instruction inside a method body, the stack and locals should have the same
//! structure, regardless of which control flow was used to reach that instruction. In other
//! words: although the values on the stack and in the locals may obviously be different, the
//! types, order, and widths of the stack and local variables cannot. This information is referred
//! to as the _stack map frame_ (represented using [`StackFrame`]), and the "types" it tracks
//! (represented using [`Operand`]) are slightly augmented compared to declared types, taking into
//! account initialization, null, and the two-slot layout of 64-bit values.
//!
//! Knowing the frame at a point in the code makes it possible to check that the next instruction
//! makes sense (eg. adding two doubles only makes sense if the top two elements of the stack are
//! of type `double`). Straight-line code is the simple part: a driver walks the instructions and
//! applies the matching [`OperandStack`] and [`Locals`] operations, each of which enforces its
//! own preconditions. Things get more complicated when an instruction can be reached from
//! multiple locations (eg. it is the target of jumps). In those cases, the frames from the
//! different source locations need to be unified with [`StackFrame::merge_into`]. Since
//! unification only ever moves types up the subtyping lattice (towards less precise types), a
//! driver that re-checks code whenever the recorded frame at an offset changes is running a
//! fix-point algorithm which converges towards the right answer (if there is one). This is the
//! core of [verification by type-checking][0], which the JVM itself performs when loading a
//! class.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.10.1

use crate::access_flags::MethodAccessFlags;
use crate::descriptors::{MethodDescriptor, RenderDescriptor};
use crate::names::{BinaryName, Name, UnqualifiedName};
use std::fmt;

mod frame;
mod locals;
mod operand;
mod stack;

pub use frame::*;
pub use locals::*;
pub use operand::*;
pub use stack::*;

/// Method whose body is being checked
#[derive(Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Class defining the method
    pub class: BinaryName,

    /// Name of the method
    pub name: UnqualifiedName,

    /// Parameter and return types
    pub descriptor: MethodDescriptor,

    /// Method access flags
    pub access_flags: MethodAccessFlags,
}

impl MethodInfo {
    /// Static methods get no `this` receiver in their locals
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    /// Instance constructors start out with an uninitialized receiver
    pub fn is_constructor(&self) -> bool {
        self.name == UnqualifiedName::INIT
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "{}.{}:{}",
            self.class.as_str(),
            self.name.as_str(),
            self.descriptor.render(),
        ))
    }
}
