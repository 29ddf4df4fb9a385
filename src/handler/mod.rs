pub mod api;
pub mod ent;
pub mod page;
pub use api::{listen, router, AppState};
pub use ent::*;
