//! Lead-nurture automation for Renovo.
//!
//! The core of the scheduler: a pure aging classifier, a per-stage cadence
//! policy, a due-work selector, and a dispatcher that renders templated
//! emails and hands them to a delivery collaborator. Everything is driven
//! by external triggers (scheduled job or admin action) calling
//! [`run_cycle`] — there is no long-lived background process.
//!
//! Double-send safety comes from an atomic claim: each due schedule is
//! advanced with a conditional update before its message is sent, so two
//! overlapping cycle invocations cannot both dispatch the same lead.

pub mod aging;
pub mod cycle;
pub mod dispatcher;
pub mod error;
pub mod policy;
pub mod selector;
pub mod service;
pub mod template;

pub use aging::{is_aging, AGING_THRESHOLD_DAYS};
pub use cycle::{run_cycle, CycleSummary};
pub use dispatcher::DispatchOutcome;
pub use error::{AutomationError, Result};
pub use policy::StagePolicy;
pub use selector::{DueWorkItem, Selection};
pub use template::EmailKind;
