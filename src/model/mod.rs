pub mod order;
pub mod tick;
