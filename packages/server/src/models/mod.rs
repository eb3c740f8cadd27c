pub mod admin;
pub mod order;
pub mod product;
pub mod shared;
pub mod upload;
pub mod webhook;

pub use admin::*;
pub use order::*;
pub use product::*;
pub use shared::*;
pub use upload::*;
pub use webhook::*;
