mod machine;
mod status;

pub use machine::{LifecycleStateMachine, Operation, Transition};
pub use status::CarouselStatus;
