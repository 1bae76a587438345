pub mod http;
pub mod source;
pub mod storage;
pub mod stream;
pub mod vision;
