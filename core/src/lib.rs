pub mod client;
pub mod config;
pub mod diff;
pub mod error;
pub mod format;
pub mod model;
pub mod panels;
pub mod scheduler;
pub mod targets;

pub use client::{
    classify_status, ClientConfig, ConnectClient, ConnectFuture, HttpConnectClient,
    MockConnectClient, DEFAULT_BASE_URL,
};
pub use config::{DashConfig, SessionToken, Settings, LOG_LEVEL_VAR};
pub use diff::{diff, ChangeEvent, ChangeSet};
pub use error::Error;
pub use model::{
    EpochSeconds, Event, File, FileKind, FileMeta, Job, JobInfo, PrinterId, PrinterSnapshot,
    PrinterState, Reading, SlotInfo, Temperatures, ToolSlot,
};
pub use panels::{
    current_job_file, tool_rows, CurrentJobPanel, EventRow, Field, FileCard, HeaderPanel,
    JobCard, Progress, ToolRow,
};
pub use scheduler::{
    choose_interval, AdaptDecision, FetchOutcome, Intervals, RefreshScheduler, RequestId,
    Reschedule, RunState, SkipReason, TickDecision,
};
