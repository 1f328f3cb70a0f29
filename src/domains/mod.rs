pub mod binding;
pub mod export;
