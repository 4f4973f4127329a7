pub mod stream;
pub mod web;
