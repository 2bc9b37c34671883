pub mod chat;
pub mod db;
pub mod grocery;
pub mod models;
pub mod plan;
pub mod recipes;
pub mod service;
