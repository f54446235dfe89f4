pub mod history;
pub mod knife;
pub mod tools;
