pub mod take_counter;

pub use take_counter::TakeCounter;
