//! Signal snapshot types: named environment observations tagged with an
//! acquisition state.
//!
//! A [`Snapshot`] is built once per detection session by an external
//! collector and is immutable afterwards. Every observation that is
//! asynchronous to acquire (permission queries, device enumeration, timing
//! probes) must be fully resolved before the snapshot is handed to the
//! engine; nothing in here awaits.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical signal names shared between snapshot producers, the detector
/// library, and rule parameter binding.
pub mod names {
    pub const USER_AGENT: &str = "userAgent";
    pub const APP_VERSION: &str = "appVersion";
    pub const WEB_DRIVER: &str = "webDriver";
    pub const LANGUAGES: &str = "languages";
    pub const PRODUCT_SUB: &str = "productSub";
    pub const PLUGINS_LENGTH: &str = "pluginsLength";
    pub const WINDOW_SIZE: &str = "windowSize";
    pub const DOCUMENT_FOCUS: &str = "documentFocus";
    pub const ERROR_TRACE: &str = "errorTrace";
    pub const DOCUMENT_ELEMENT_KEYS: &str = "documentElementKeys";
    pub const FUNCTION_BIND: &str = "functionBind";
    pub const DISTINCTIVE_PROPS: &str = "distinctiveProps";
    pub const NOTIFICATION_PERMISSION: &str = "notificationPermission";
    pub const MIME_TYPES_CONSISTENT: &str = "mimeTypesConsistent";
    pub const EVAL_LENGTH: &str = "evalLength";
    pub const WEB_GL: &str = "webGL";
    pub const WINDOW_EXTERNAL: &str = "windowExternal";
    pub const PLATFORM: &str = "platform";
    pub const COOKIES_ENABLED: &str = "cookiesEnabled";
    pub const HARDWARE_CONCURRENCY: &str = "hardwareConcurrency";
    pub const DEVICE_MEMORY: &str = "deviceMemory";
    pub const MAX_TOUCH_POINTS: &str = "maxTouchPoints";
    pub const BROWSER_KIND: &str = "browserKind";
    pub const BROWSER_ENGINE_KIND: &str = "browserEngineKind";
    pub const MEDIA_DEVICE_COUNT: &str = "mediaDeviceCount";
    pub const MEDIA_PERMISSIONS: &str = "mediaPermissions";
    pub const NAVIGATION_DURATION: &str = "navigationDuration";
    pub const INTERACTION_LATENCY: &str = "interactionLatency";
    pub const RTC_CANDIDATES: &str = "rtcCandidates";
    pub const RTT: &str = "rtt";
    pub const PROCESS: &str = "process";
}

/// Whether acquisition of a signal succeeded.
///
/// A `Failure` value must not be trusted by any consumer, even when it is
/// non-null; [`Signal::trusted`] is the single enforcement point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalState {
    Success,
    Failure,
}

/// One named environment observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(default)]
    pub value: Value,
    pub state: SignalState,
}

impl Signal {
    /// A successfully acquired observation.
    pub fn success(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            state: SignalState::Success,
        }
    }

    /// A failed acquisition (unsupported API, permission denial, thrown
    /// exception in the collector). The value is pinned to null.
    pub fn failure() -> Self {
        Self {
            value: Value::Null,
            state: SignalState::Failure,
        }
    }

    /// The value, only if acquisition succeeded.
    pub fn trusted(&self) -> Option<&Value> {
        match self.state {
            SignalState::Success => Some(&self.value),
            SignalState::Failure => None,
        }
    }
}

/// The complete, immutable set of signals for one detection session.
///
/// Absent signals behave identically to `Failure` signals: every trusted
/// lookup returns `None` for both, so detectors degrade to "no match"
/// without distinguishing the two cases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    signals: HashMap<String, Signal>,
}

impl Snapshot {
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    /// Raw access, including failed signals. Rule parameter binding uses
    /// this deliberately: the rule scope sees values regardless of state.
    pub fn get(&self, name: &str) -> Option<&Signal> {
        self.signals.get(name)
    }

    /// The value of a successfully acquired signal.
    pub fn trusted(&self, name: &str) -> Option<&Value> {
        self.signals.get(name).and_then(Signal::trusted)
    }

    /// Trusted lookup through a dotted path: the first segment names the
    /// signal, the rest descend into its structured value
    /// (`"windowSize.outerWidth"`).
    pub fn trusted_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let name = segments.next()?;
        let mut current = self.trusted(name)?;
        for segment in segments {
            current = current.get(segment)?;
        }
        Some(current)
    }

    pub fn str_value(&self, name: &str) -> Option<&str> {
        self.trusted(name).and_then(Value::as_str)
    }

    pub fn bool_value(&self, name: &str) -> Option<bool> {
        self.trusted(name).and_then(Value::as_bool)
    }

    pub fn u64_value(&self, name: &str) -> Option<u64> {
        self.trusted(name).and_then(Value::as_u64)
    }

    pub fn f64_value(&self, name: &str) -> Option<f64> {
        self.trusted(name).and_then(Value::as_f64)
    }

    /// Length of an array-valued signal.
    pub fn array_len(&self, name: &str) -> Option<usize> {
        self.trusted(name).and_then(Value::as_array).map(Vec::len)
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

/// Builder for the snapshot producer. Consumed by `build`; the resulting
/// [`Snapshot`] has no mutating API.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    signals: HashMap<String, Signal>,
}

impl SnapshotBuilder {
    pub fn signal(mut self, name: impl Into<String>, signal: Signal) -> Self {
        self.signals.insert(name.into(), signal);
        self
    }

    pub fn success(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.signal(name, Signal::success(value))
    }

    pub fn failure(self, name: impl Into<String>) -> Self {
        self.signal(name, Signal::failure())
    }

    pub fn build(self) -> Snapshot {
        Snapshot {
            signals: self.signals,
        }
    }
}
