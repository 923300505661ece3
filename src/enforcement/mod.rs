//! Rules a machine enforces on the code that drives it.
//!
//! Two kinds of mistakes are caught here:
//!
//! - **Hierarchy violations** are found before the machine starts. They are
//!   accumulated with Stillwater's `Validation`, so `start()` reports every
//!   problem of a broken hierarchy at once instead of the first one.
//! - **Usage violations** happen while callbacks run (for example requesting
//!   a transition from an intermediate `exit`). They are logged at error
//!   level, kept on the machine and handled per [`ViolationStrategy`].

pub mod rules;
pub mod violations;

pub use rules::{check_hierarchy, violations_of, HierarchyViolation};
pub use violations::{UsageViolation, ViolationStrategy};
