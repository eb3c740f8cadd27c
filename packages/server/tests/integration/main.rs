mod common;

mod download;
mod products;
mod storage;
