pub mod admindtos;
pub mod ticketdtos;
pub mod userdtos;
