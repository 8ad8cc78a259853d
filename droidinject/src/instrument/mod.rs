//! Body rewriting passes
//!
//! [insert] places statements relative to prologues, epilogues and
//! matching statements. [discovery] and [inject] make the creation method
//! of the main activity call every registered listener and declarative
//! click handler, [substitute] swaps a class for a subclass and [wrap]
//! routes call arguments through a helper.

pub mod insert;
pub use insert::{
    insert_after_matching, insert_after_regex, insert_at_beginning, insert_at_end,
    insert_before_matching, insert_before_regex, StmtPredicate, TextPattern,
};

mod registry;
pub use registry::ListenerRegistry;

pub mod discovery;
pub use discovery::{
    creation_signature, discover, find_creation_method, Lifecycle, CREATION_SIGNATURE,
};

pub mod inject;
pub use inject::{inject, insert_calls_to_lifecycle_methods, InjectionOutcome, InjectionReport};

pub mod substitute;
pub use substitute::{replace_type, SkipDiagnostic, SkipReason, SubstitutionReport};

mod wrap;
pub use wrap::wrap_first_argument;
