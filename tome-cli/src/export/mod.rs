pub mod cli;
pub mod handlers;
pub mod mtx;
pub mod sink;
