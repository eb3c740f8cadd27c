pub mod admin;
pub mod download;
pub mod health;
pub mod images;
pub mod orders;
pub mod products;
pub mod storage;
pub mod webhook;
