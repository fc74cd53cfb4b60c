pub mod carrier;
pub mod matching;
pub mod request;
pub mod route;
pub mod settlement;
pub mod station;
