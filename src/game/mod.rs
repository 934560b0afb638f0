pub mod event;
pub mod machine;
pub mod state;
pub mod surface;
pub mod timer;
