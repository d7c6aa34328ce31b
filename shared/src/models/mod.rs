//! Domain models shared between the backend services and the reconciliation rules

mod history;
mod stock;
mod user;

pub use history::*;
pub use stock::*;
pub use user::*;
