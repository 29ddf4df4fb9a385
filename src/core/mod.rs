pub mod cache;
pub mod collector;
pub mod doctor;
pub mod ent;
pub mod logger;
pub use cache::{Clock, HealthCache, SystemClock};
pub use collector::collect;
pub use doctor::*;
pub use ent::*;
pub use logger::*;
