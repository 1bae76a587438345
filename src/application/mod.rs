pub mod dto;
pub mod pipeline;
pub mod ports;
pub mod services;
