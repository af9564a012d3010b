pub mod database;
pub mod enrollment;
pub mod gateway;
pub mod memory;
pub mod orders;
pub mod signature;
pub mod store;
pub mod subscription;
pub mod users;
pub mod verification;
