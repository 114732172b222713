pub mod a2a;
pub mod agent;
pub mod health;
