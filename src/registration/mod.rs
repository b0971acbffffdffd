//! Controller registration for a scope

mod host;
pub mod record;
mod source;

pub use host::{LifecycleEvent, Registration, UpdateOutcome};
pub use record::RegistrationRecord;
pub use source::{ConfigScriptSource, ScriptSource, StaticScriptSource};
