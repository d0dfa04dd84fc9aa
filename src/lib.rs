//! Verify JVM method bodies
//!
//! This crate implements the data structures behind verification by type checking: a class
//! hierarchy graph, a typed operand stack and local variable array, and immutable stack frames
//! that can be captured at jump targets and merged until the type state reaches a fix-point.
//!
//! ```
//! use jverify::class_graph::{ClassGraph, ClassGraphArenas};
//! use jverify::util::Offset;
//! use jverify::verifier::{Locals, MethodInfo, Operand, OperandStack, StackFrame};
//! use jverify::{
//!     BinaryName, MethodAccessFlags, MethodDescriptor, Name, ParseDescriptor, UnqualifiedName,
//! };
//!
//! let arenas = ClassGraphArenas::new();
//! let class_graph = ClassGraph::new(&arenas);
//! class_graph.insert_java_library_types();
//!
//! let method = MethodInfo {
//!     class: BinaryName::from_string("com/example/Boxer".to_string()).unwrap(),
//!     name: UnqualifiedName::from_string("choose".to_string()).unwrap(),
//!     descriptor: MethodDescriptor::parse("(I)Ljava/lang/Number;").unwrap(),
//!     access_flags: MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
//! };
//! let locals = Locals::for_method(&method, 1).unwrap();
//!
//! // Two paths reach offset 14: one boxed an `Integer`, the other a `Long`
//! let mut stack = OperandStack::new(1);
//! stack.push(Operand::object(BinaryName::INTEGER)).unwrap();
//! let from_then_branch = StackFrame::capture(Offset(14), &stack, &locals);
//!
//! let mut stack = OperandStack::new(1);
//! stack.push(Operand::object(BinaryName::LONG)).unwrap();
//! let from_else_branch = StackFrame::capture(Offset(14), &stack, &locals);
//!
//! // Merging generalizes the stack entry to the nearest common superclass
//! let merged = from_else_branch
//!     .merge_into(&from_then_branch, &class_graph)
//!     .unwrap();
//! let (_, _, top) = merged.stack().iter().next().unwrap();
//! assert_eq!(*top, Operand::object(BinaryName::NUMBER));
//! ```

mod access_flags;
pub mod class_graph;
mod descriptors;
mod errors;
mod names;
pub mod util;
pub mod verifier;

pub use access_flags::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
