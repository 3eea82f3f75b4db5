pub mod doctor;
pub mod env;
pub mod run;
pub mod setup;
pub mod spawn;
