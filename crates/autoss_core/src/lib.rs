//! Save-state instrumentation of Verilog module hierarchies.
//!
//! Given parsed syntax trees, this crate finds every register written by a
//! clocked block, lays out the state of a whole instance hierarchy in one
//! bit vector and splices save/restore logic into the module text:
//!
//! 1. [`extract::extract_modules`] reads registers, instances, clocked blocks
//!    and parameters from each module declaration.
//! 2. [`Design::resolve`] binds instances to definitions and rejects
//!    instantiation cycles.
//! 3. [`Design::allocate`] assigns every register and stateful instance a
//!    range of the state vector, symbolic in the module parameters.
//! 4. [`mutate::instrument`] inserts ports, logic and connections, and
//!    [`mutate::emit_module`] serializes each module.
//!
//! [`mutate::generate`] runs steps 2 to 4 for one root module.

#![warn(missing_docs)]

pub mod allocate;
pub mod arena;
pub mod design;
pub mod dimension;
pub mod entities;
pub mod error;
pub mod expr;
pub mod extract;
pub mod ids;
pub mod mutate;
pub mod resolve;
pub mod synth;

pub use design::{Design, SourceTree};
pub use dimension::Dimension;
pub use entities::{Assignment, Module, ModuleInstance, Parameter, Register};
pub use error::StateError;
pub use expr::{Expr, ExprError};
pub use extract::extract_modules;
pub use ids::{ModuleId, TreeId};
pub use mutate::{emit_module, generate, instrument, EmittedModule, BANNER_RULE};
pub use synth::Synthesizer;
