pub mod account;
pub mod department;
pub mod employee;
pub mod request;
pub mod status;
pub mod workflow;
