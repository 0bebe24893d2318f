pub mod ids;
pub mod interrupt;
pub mod logging;
pub mod time;

pub use ids::{
    generate_invocation_id, validate_name_value, ConfigName, ObjectId, ScenarioName, TestSetName,
};
pub use interrupt::{sleep_with_interrupt, Interrupt};
pub use logging::{append_runtime_log, LogLevel, StepLog, StepLogLine};
