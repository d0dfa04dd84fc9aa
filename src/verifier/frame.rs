use super::{Locals, Operand, OperandStack};
use crate::class_graph::ClassGraph;
use crate::errors::{VerifyError, VerifyErrorKind};
use crate::names::BinaryName;
use crate::util::{Offset, OffsetVec};

/// Verification state at one instruction boundary
///
/// A frame recorded at a jump target is the two-way contract of the fix-point: every path
/// reaching that target must produce a state that can be merged into the recorded one, and the
/// target's successors are re-checked whenever the merge changes the recorded state. Since
/// recorded frames are only ever replaced wholesale, a captured frame never aliases the working
/// stack and locals it came from.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StackFrame {
    offset: Offset,
    stack: OperandStack,
    locals: Locals,
}

impl StackFrame {
    /// Snapshot the working state at the given bytecode offset
    pub fn capture(offset: Offset, stack: &OperandStack, locals: &Locals) -> StackFrame {
        StackFrame {
            offset,
            stack: stack.clone(),
            locals: locals.clone(),
        }
    }

    /// Bytecode offset the frame was recorded at
    pub fn offset(&self) -> Offset {
        self.offset
    }

    pub fn stack(&self) -> &OperandStack {
        &self.stack
    }

    pub fn locals(&self) -> &Locals {
        &self.locals
    }

    /// Do the two frames have the same number of stack entries?
    pub fn same_height(&self, other: &StackFrame) -> bool {
        self.stack.len() == other.stack.len()
    }

    /// Merge this frame into a frame previously recorded at a jump target
    ///
    /// The merged frame keeps the target's offset. Stack operands must merge slot for slot, and
    /// stacks of different heights cannot be reconciled at all. Local slots that cannot be merged
    /// are not an error: the slot just degrades to [`Operand::Invalid`] and the value is lost to
    /// whatever code follows the join.
    pub fn merge_into<'g>(
        &self,
        target: &StackFrame,
        types: &'g ClassGraph<'g>,
    ) -> Result<StackFrame, VerifyError> {
        let offset = target.offset;

        if !self.same_height(target) {
            log::error!(
                "Cannot merge stacks of heights {} and {} (at {:?})",
                self.stack.len(),
                target.stack.len(),
                offset,
            );
            return Err(VerifyErrorKind::MergeHeightMismatch {
                found: self.stack.len(),
                expected: target.stack.len(),
            }
            .at(offset));
        }

        let mut entries: OffsetVec<Operand> = OffsetVec::new();
        for ((_, _, incoming), (_, _, recorded)) in self.stack.iter().zip(target.stack.iter()) {
            match incoming
                .merge_with(recorded, types)
                .map_err(|kind| kind.at(offset))?
            {
                Some(merged) => {
                    entries.push(merged);
                }
                None => {
                    log::error!(
                        "Cannot merge stack operands: found {:?} but expected {:?} (at {:?})",
                        incoming,
                        recorded,
                        offset,
                    );
                    return Err(VerifyErrorKind::IncompatibleTypes(
                        incoming.clone(),
                        recorded.clone(),
                    )
                    .at(offset));
                }
            }
        }

        let mut slots: Vec<Operand> = Vec::with_capacity(target.locals.len());
        for (incoming, recorded) in self.locals.iter().zip(target.locals.iter()) {
            let merged = incoming
                .merge_with(recorded, types)
                .map_err(|kind| kind.at(offset))?;
            slots.push(merged.unwrap_or(Operand::Invalid));
        }

        Ok(StackFrame {
            offset,
            stack: OperandStack {
                entries,
                capacity: target.stack.capacity,
            },
            locals: Locals { slots },
        })
    }

    /// Frame an exception handler starts in when its protected range throws from this state
    ///
    /// The locals carry over as they are, but the stack is wiped down to just the thrown
    /// exception. A handler with no catch type sees `java.lang.Throwable`. A catch type that
    /// resolves to something other than a `Throwable` subclass is rejected; one that does not
    /// resolve at all is taken on faith.
    pub fn handler_frame<'g>(
        &self,
        handler_offset: Offset,
        catch_type: Option<&BinaryName>,
        types: &'g ClassGraph<'g>,
    ) -> Result<StackFrame, VerifyError> {
        let thrown = match catch_type {
            None => Operand::object(BinaryName::THROWABLE),
            Some(name) => {
                if let Some(class) = types.lookup_class(name) {
                    if !ClassGraph::is_throwable(class) {
                        log::error!("Catch type {:?} is not throwable (at {:?})", name, handler_offset);
                        return Err(VerifyErrorKind::NotThrowable(name.clone()).at(handler_offset));
                    }
                }
                Operand::object(name.clone())
            }
        };

        let mut stack = self.stack.clone();
        stack.clear();
        stack.push(thrown).map_err(|kind| kind.at(handler_offset))?;

        Ok(StackFrame {
            offset: handler_offset,
            stack,
            locals: self.locals.clone(),
        })
    }

    /// Replace every occurrence of an uninitialized type with its initialized form
    ///
    /// This is the effect of a constructor call: once `<init>` runs on an operand, every alias of
    /// that operand anywhere in the frame becomes initialized at the same time.
    pub fn initialize_uninitialized(
        &mut self,
        uninitialized: &Operand,
    ) -> Result<Operand, VerifyErrorKind> {
        let initialized = self.stack.initialize_uninitialized(uninitialized)?;
        self.locals
            .initialize_uninitialized(uninitialized, &initialized);
        Ok(initialized)
    }
}
