pub mod download_verification;
pub mod order;
pub mod product;
