pub mod assemble;
pub mod collector;
pub mod date;
pub mod dedup;
pub mod driver;
pub mod replay;
pub mod selectors;
pub mod settle;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod workflows;

pub use collector::{
    collect, Collection, CollectionReport, CollectorBounds, CollectorState, ScrollSource,
};
pub use dedup::IdentitySet;
pub use driver::{ElementRef, Scope, UiDriver};
pub use replay::ReplayDriver;
pub use workflows::Harvester;
