pub mod errors;
pub mod startup;

pub use startup::run;
