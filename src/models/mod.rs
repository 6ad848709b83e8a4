pub mod adminmodel;
pub mod ticketmodel;
pub mod usermodel;
