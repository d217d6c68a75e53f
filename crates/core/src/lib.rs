pub mod config;
pub mod detector;
pub mod enrollment;
pub mod metrics;
pub mod notify;
pub mod session;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DetectorConfig,
    SanitizedConfig, ServerConfig,
};
pub use detector::{
    AccelerationInfo, ControlResponse, DetectorControl, DetectorError, DetectorSettings,
    DetectorStats, EnrollResponse, EnrollStatus, EnrollmentService, FaceDbResponse, FacePerson,
    HttpDetectorClient, SettingsUpdate,
};
pub use enrollment::{
    BatchRun, BatchSummary, Disposition, EnrollmentConfig, EnrollmentError,
    EnrollmentOrchestrator, PhotoItem, ProcessingMode,
};
pub use notify::{
    BatchProgress, DecisionChannel, DecisionError, DecisionPrompt, ListRefreshCallback,
    Notification, NotificationSink, ProgressSink, Severity,
};
pub use session::{SessionFlags, SessionFlagsUpdate};
