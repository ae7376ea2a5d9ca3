pub mod alert;
pub mod run;
pub mod settings;
pub mod stats;
