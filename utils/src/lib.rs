pub mod debugger;
pub mod logging;
