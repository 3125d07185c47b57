mod database {
    pub mod actions;
    pub mod connection;
    pub mod error;
    pub mod form;
    pub mod pagination;
    pub mod schema;
    pub mod shopping_list;
    pub mod validation;
}
mod authentication {
    pub mod cryptography;
    pub mod permissions;
    pub mod session;
}
pub mod config;
mod constants;

mod cache {
    pub mod cache;
}

pub use authentication::*;
pub use cache::cache::*;
pub use constants::*;
pub use database::*;
pub use shopping_list::*;
