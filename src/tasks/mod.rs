pub mod debounce_task;
pub mod edge_task;
pub mod power_task;
pub mod sampling_task;
