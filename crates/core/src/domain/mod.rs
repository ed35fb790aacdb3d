pub mod crm;
pub mod listing;
pub mod message;
