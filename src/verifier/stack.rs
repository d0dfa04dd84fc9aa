use super::{Operand, StackFrame};
use crate::class_graph::ClassGraph;
use crate::errors::VerifyErrorKind;
use crate::util::{Offset, OffsetVec, OffsetVecIter, Width};

/// Operand stack half of a frame
///
/// Heights and capacities are measured in slots, not in values: a `long` or `double` occupies two
/// slots, so a stack with `max_stack = 2` holds one wide value or two narrow ones.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OperandStack {
    pub(crate) entries: OffsetVec<Operand>,
    pub(crate) capacity: Offset,
}

impl OperandStack {
    /// New empty stack with the given slot capacity (the method's `max_stack`)
    pub fn new(max_stack: usize) -> OperandStack {
        OperandStack {
            entries: OffsetVec::new(),
            capacity: Offset(max_stack),
        }
    }

    /// Number of values on the stack
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the stack empty?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of slots in use (wide values count twice)
    pub fn size(&self) -> Offset {
        self.entries.offset_len()
    }

    /// Slot capacity the stack was created with
    pub fn capacity(&self) -> Offset {
        self.capacity
    }

    /// Iterate over the entries, bottom of the stack first
    pub fn iter(&self) -> OffsetVecIter<'_, Operand> {
        self.entries.iter()
    }

    /// Push a value, checking the slot capacity
    pub fn push(&mut self, operand: Operand) -> Result<(), VerifyErrorKind> {
        if self.entries.offset_len().0 + operand.width() > self.capacity.0 {
            return Err(VerifyErrorKind::StackOverflow(self.capacity));
        }
        self.entries.push(operand);
        Ok(())
    }

    /// Pop the top value, whatever it is
    pub fn pop(&mut self) -> Result<Operand, VerifyErrorKind> {
        self.entries
            .pop()
            .map(|(_, _, operand)| operand)
            .ok_or(VerifyErrorKind::EmptyStack)
    }

    /// Pop a value which must comply with the expected type
    pub fn pop_expecting<'g>(
        &mut self,
        expected: &Operand,
        types: &'g ClassGraph<'g>,
    ) -> Result<Operand, VerifyErrorKind> {
        let found = self.pop()?;
        if found.complies_with(expected, types) {
            Ok(found)
        } else if found.is_uninitialized() {
            Err(VerifyErrorKind::UninitializedUse(found))
        } else {
            log::error!(
                "Incompatible operand: found {:?} but expected {:?}",
                found,
                expected,
            );
            Err(VerifyErrorKind::IncompatibleTypes(found, expected.clone()))
        }
    }

    /// Pop a value which must be a reference (an uninitialized reference is still a reference)
    pub fn pop_reference(&mut self) -> Result<Operand, VerifyErrorKind> {
        let found = self.pop()?;
        if found.is_reference() {
            Ok(found)
        } else {
            Err(VerifyErrorKind::IncompatibleTypes(found, Operand::AnyObject))
        }
    }

    /// Pop the receiver of a constructor call
    ///
    /// The value must be an uninitialized reference, and the type it will have once constructed
    /// must comply with `expected`.
    pub fn pop_uninitialized<'g>(
        &mut self,
        expected: &Operand,
        types: &'g ClassGraph<'g>,
    ) -> Result<Operand, VerifyErrorKind> {
        let found = self.pop()?;
        match found.initialized() {
            None => Err(VerifyErrorKind::UninitializedUse(found)),
            Some(initialized) => {
                if initialized.complies_with(expected, types) {
                    Ok(found)
                } else {
                    Err(VerifyErrorKind::IncompatibleTypes(found, expected.clone()))
                }
            }
        }
    }

    /// Pop a value which must have the given width
    fn pop_expecting_width(&mut self, expected_width: usize) -> Result<Operand, VerifyErrorKind> {
        let operand = self.pop()?;
        let found_width = operand.width();
        if found_width == expected_width {
            Ok(operand)
        } else {
            Err(VerifyErrorKind::InvalidWidth(found_width))
        }
    }

    /// `pop`: drop the top value, which must be a single slot wide
    pub fn discard(&mut self) -> Result<(), VerifyErrorKind> {
        let _ = self.pop_expecting_width(1)?;
        Ok(())
    }

    /// `pop2`: drop the top two slots (two narrow values, or one wide value)
    pub fn discard2(&mut self) -> Result<(), VerifyErrorKind> {
        let arg1 = self.pop()?;
        match arg1.width() {
            // Form 1
            1 => {
                let _ = self.pop_expecting_width(1)?;
            }

            // Form 2
            2 => (),

            other => return Err(VerifyErrorKind::InvalidWidth(other)),
        }
        Ok(())
    }

    /// `dup`: duplicate the top value, which must be a single slot wide
    pub fn dup(&mut self) -> Result<(), VerifyErrorKind> {
        let arg1 = self.pop_expecting_width(1)?;
        self.push(arg1.clone())?;
        self.push(arg1)?;
        Ok(())
    }

    /// `dup_x1`: duplicate the top value underneath the value below it
    pub fn dup_x1(&mut self) -> Result<(), VerifyErrorKind> {
        let arg1 = self.pop_expecting_width(1)?;
        let arg2 = self.pop_expecting_width(1)?;
        self.push(arg1.clone())?;
        self.push(arg2)?;
        self.push(arg1)?;
        Ok(())
    }

    /// `dup_x2`: duplicate the top value underneath the two slots below it
    pub fn dup_x2(&mut self) -> Result<(), VerifyErrorKind> {
        let arg1 = self.pop_expecting_width(1)?;
        let arg2 = self.pop()?;
        match arg2.width() {
            // Form 1
            1 => {
                let arg3 = self.pop_expecting_width(1)?;
                self.push(arg1.clone())?;
                self.push(arg3)?;
                self.push(arg2)?;
                self.push(arg1)?;
            }

            // Form 2
            2 => {
                self.push(arg1.clone())?;
                self.push(arg2)?;
                self.push(arg1)?;
            }

            other => return Err(VerifyErrorKind::InvalidWidth(other)),
        }
        Ok(())
    }

    /// `dup2`: duplicate the top two slots
    pub fn dup2(&mut self) -> Result<(), VerifyErrorKind> {
        let arg1 = self.pop()?;
        match arg1.width() {
            // Form 1
            1 => {
                let arg2 = self.pop_expecting_width(1)?;
                self.push(arg2.clone())?;
                self.push(arg1.clone())?;
                self.push(arg2)?;
                self.push(arg1)?;
            }

            // Form 2
            2 => {
                self.push(arg1.clone())?;
                self.push(arg1)?;
            }

            other => return Err(VerifyErrorKind::InvalidWidth(other)),
        }
        Ok(())
    }

    /// `dup2_x1`: duplicate the top two slots underneath the value below them
    pub fn dup2_x1(&mut self) -> Result<(), VerifyErrorKind> {
        let arg1 = self.pop()?;
        match arg1.width() {
            // Form 1
            1 => {
                let arg2 = self.pop_expecting_width(1)?;
                let arg3 = self.pop_expecting_width(1)?;
                self.push(arg2.clone())?;
                self.push(arg1.clone())?;
                self.push(arg3)?;
                self.push(arg2)?;
                self.push(arg1)?;
            }

            // Form 2
            2 => {
                let arg2 = self.pop_expecting_width(1)?;
                self.push(arg1.clone())?;
                self.push(arg2)?;
                self.push(arg1)?;
            }

            other => return Err(VerifyErrorKind::InvalidWidth(other)),
        }
        Ok(())
    }

    /// `dup2_x2`: duplicate the top two slots underneath the two slots below them
    pub fn dup2_x2(&mut self) -> Result<(), VerifyErrorKind> {
        let arg1 = self.pop()?;
        match arg1.width() {
            1 => {
                let arg2 = self.pop_expecting_width(1)?;
                let arg3 = self.pop()?;
                match arg3.width() {
                    // Form 1
                    1 => {
                        let arg4 = self.pop_expecting_width(1)?;
                        self.push(arg2.clone())?;
                        self.push(arg1.clone())?;
                        self.push(arg4)?;
                        self.push(arg3)?;
                        self.push(arg2)?;
                        self.push(arg1)?;
                    }

                    // Form 3
                    2 => {
                        self.push(arg2.clone())?;
                        self.push(arg1.clone())?;
                        self.push(arg3)?;
                        self.push(arg2)?;
                        self.push(arg1)?;
                    }

                    other => return Err(VerifyErrorKind::InvalidWidth(other)),
                }
            }

            2 => {
                let arg2 = self.pop()?;
                match arg2.width() {
                    // Form 2
                    1 => {
                        let arg3 = self.pop_expecting_width(1)?;
                        self.push(arg1.clone())?;
                        self.push(arg3)?;
                        self.push(arg2)?;
                        self.push(arg1)?;
                    }

                    // Form 4
                    2 => {
                        self.push(arg1.clone())?;
                        self.push(arg2)?;
                        self.push(arg1)?;
                    }

                    other => return Err(VerifyErrorKind::InvalidWidth(other)),
                }
            }

            other => return Err(VerifyErrorKind::InvalidWidth(other)),
        }
        Ok(())
    }

    /// `swap`: exchange the top two values, which must both be a single slot wide
    pub fn swap(&mut self) -> Result<(), VerifyErrorKind> {
        let arg1 = self.pop_expecting_width(1)?;
        let arg2 = self.pop_expecting_width(1)?;
        self.push(arg1)?;
        self.push(arg2)?;
        Ok(())
    }

    /// Empty the stack
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Check this stack against the one in a recorded frame
    ///
    /// Returns the first position (bottom of the stack first) holding a value that does not
    /// comply with the recorded one, or `None` when every value complies. Stacks of different
    /// heights are not merge candidates at all: that is a hard failure.
    pub fn merge_into<'g>(
        &self,
        recorded: &StackFrame,
        types: &'g ClassGraph<'g>,
    ) -> Result<Option<usize>, VerifyErrorKind> {
        let recorded_stack = recorded.stack();
        if self.len() != recorded_stack.len() {
            return Err(VerifyErrorKind::MergeHeightMismatch {
                found: self.len(),
                expected: recorded_stack.len(),
            });
        }

        for ((_, index, found), (_, _, expected)) in self.iter().zip(recorded_stack.iter()) {
            if !found.complies_with_in_merge(expected, types) {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Replace every occurrence of an uninitialized type with its initialized form
    ///
    /// Returns the initialized type that was substituted in.
    pub fn initialize_uninitialized(
        &mut self,
        uninitialized: &Operand,
    ) -> Result<Operand, VerifyErrorKind> {
        let initialized = uninitialized
            .initialized()
            .ok_or_else(|| VerifyErrorKind::UninitializedUse(uninitialized.clone()))?;
        replace_all(&mut self.entries, uninitialized, || initialized.clone());
        Ok(initialized)
    }
}

fn replace_all(
    offset_vec: &mut OffsetVec<Operand>,
    original: &Operand,
    updated: impl Fn() -> Operand,
) {
    let mut replaced: OffsetVec<Operand> = std::mem::take(offset_vec)
        .into_iter()
        .map(|(_, _, operand)| {
            if operand == *original {
                updated()
            } else {
                operand
            }
        })
        .collect();

    std::mem::swap(offset_vec, &mut replaced);
}
