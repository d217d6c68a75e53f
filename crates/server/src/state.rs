use std::sync::{Arc, RwLock};

use lookout_core::{
    Config, DecisionChannel, DetectorControl, EnrollmentOrchestrator, EnrollmentService,
    NotificationSink, ProgressSink, SanitizedConfig, SessionFlags, SessionFlagsUpdate,
};

use crate::api::{WsBroadcaster, WsDecisionChannel, WsNotifier};

/// Shared application state
pub struct AppState {
    config: Config,
    detector: Arc<dyn DetectorControl>,
    orchestrator: Arc<EnrollmentOrchestrator>,
    decisions: Arc<WsDecisionChannel>,
    ws_broadcaster: WsBroadcaster,
    session_flags: RwLock<SessionFlags>,
}

impl AppState {
    pub fn new(
        config: Config,
        detector: Arc<dyn DetectorControl>,
        orchestrator: Arc<EnrollmentOrchestrator>,
        decisions: Arc<WsDecisionChannel>,
        ws_broadcaster: WsBroadcaster,
    ) -> Self {
        Self {
            config,
            detector,
            orchestrator,
            decisions,
            ws_broadcaster,
            session_flags: RwLock::new(SessionFlags::default()),
        }
    }

    /// Wire an orchestrator to the WebSocket stream and build the state
    /// around a single detection service.
    pub fn with_detector<D>(config: Config, detector: Arc<D>) -> Self
    where
        D: DetectorControl + EnrollmentService + 'static,
    {
        let ws_broadcaster = WsBroadcaster::default();
        let notifier = Arc::new(WsNotifier::new(ws_broadcaster.clone()));
        let decisions = Arc::new(WsDecisionChannel::new(ws_broadcaster.clone()));

        let broadcaster_for_callback = ws_broadcaster.clone();
        let orchestrator = EnrollmentOrchestrator::new(
            config.enrollment.clone(),
            Arc::clone(&detector) as Arc<dyn EnrollmentService>,
            Arc::clone(&notifier) as Arc<dyn NotificationSink>,
            notifier as Arc<dyn ProgressSink>,
            Arc::clone(&decisions) as Arc<dyn DecisionChannel>,
        )
        .with_refresh_callback(Arc::new(move || broadcaster_for_callback.faces_changed()));

        Self::new(
            config,
            detector,
            Arc::new(orchestrator),
            decisions,
            ws_broadcaster,
        )
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn detector(&self) -> &dyn DetectorControl {
        self.detector.as_ref()
    }

    pub fn orchestrator(&self) -> &Arc<EnrollmentOrchestrator> {
        &self.orchestrator
    }

    pub fn decisions(&self) -> &WsDecisionChannel {
        self.decisions.as_ref()
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }

    pub fn session_flags(&self) -> SessionFlags {
        match self.session_flags.read() {
            Ok(flags) => *flags,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn update_session_flags(&self, update: SessionFlagsUpdate) -> SessionFlags {
        let mut flags = match self.session_flags.write() {
            Ok(flags) => flags,
            Err(poisoned) => poisoned.into_inner(),
        };
        flags.apply(update);
        *flags
    }
}
