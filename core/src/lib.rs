pub mod account;
pub mod config;
pub mod db;
pub mod member;
pub mod provision;
pub mod role;
pub mod task;
pub mod user;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;
