pub mod bridge;
pub mod network;
pub mod render;
pub mod settings;
pub mod topology;
