#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

// Recipe progression engine shared by every host.
//
// The crate avoids the Rust standard library so the same sequencer can run
// inside a game loop, a headless simulator, or a constrained device. Hosts
// feed it progress reports and subscribe to step transitions.

pub mod console;
pub mod journal;
pub mod observer;
pub mod recipes;
pub mod sensor;
pub mod sequencer;
