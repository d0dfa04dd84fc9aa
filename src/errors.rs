use super::BinaryName;
use crate::util::Offset;
use crate::verifier::Operand;

/// Fatal verification failure for the current method
///
/// Verification never recovers within a method: the first failed check wins
/// and carries the bytecode offset of the offending instruction.
#[derive(Debug)]
pub struct VerifyError {
    pub offset: Offset,
    pub kind: VerifyErrorKind,
}

#[derive(Debug)]
pub enum VerifyErrorKind {
    /// Pop on an empty operand stack
    EmptyStack,

    /// Push past the stack capacity (capacity is in slots)
    StackOverflow(Offset),

    /// A wide pair was torn apart, or a stack shuffle saw an operand of the
    /// wrong width (the payload is the width actually found)
    InvalidWidth(usize),

    /// Local variable access out of the `max_locals` range
    InvalidLocalIndex(usize),

    /// Found operand does not comply with the required operand
    IncompatibleTypes(Operand, Operand),

    /// A reference was used as initialized while still uninitialized, or an
    /// uninitialized reference was required but not found
    UninitializedUse(Operand),

    /// Stacks of structurally different sizes at a join point
    MergeHeightMismatch { found: usize, expected: usize },

    /// The class graph has no entry for this name (only an error where
    /// resolution is mandatory, ie. when merging)
    UnresolvedClass(BinaryName),

    /// Exception handler catch type outside the `java/lang/Throwable` hierarchy
    NotThrowable(BinaryName),
}

impl VerifyErrorKind {
    /// Attach the offset of the instruction that triggered the failure
    pub fn at(self, offset: Offset) -> VerifyError {
        VerifyError { offset, kind: self }
    }
}
