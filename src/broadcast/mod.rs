// =============================================================================
// Broadcast Module
// =============================================================================
//
// Fan-out of analysis results to connected subscribers:
// - payload:   wire representation of one push (array or `{ error }`)
// - registry:  the set of live subscriber handles
// - scheduler: periodic and on-connect triggers

pub mod payload;
pub mod registry;
pub mod scheduler;

pub use registry::{SubscriberHandle, SubscriberRegistry};
pub use scheduler::{BroadcastScheduler, PublishStatus, SubscriberEvent};
