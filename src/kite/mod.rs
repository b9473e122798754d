pub mod packet;
pub mod rest;
pub mod ticker;
pub mod types;
