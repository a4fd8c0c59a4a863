pub mod export;
pub mod grid;
pub mod rest;
