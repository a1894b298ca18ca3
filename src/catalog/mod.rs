pub mod repo;

pub use repo::Product;
