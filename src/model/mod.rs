pub mod admin;
pub mod company;
pub mod document;
pub mod employee;
pub mod increment;
pub mod payment;
pub mod role;
