pub mod directory;
pub mod login;
pub mod registration;
