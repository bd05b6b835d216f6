//! Identity-string detectors: substring/pattern checks over version and
//! agent-identifying text.

use botvet_core::signal::names;
use botvet_core::BotKind;

use super::probes::{Predicate, Probe};
use super::Detector;

const APP_VERSION_PROBES: &[Probe] = &[
    Probe {
        signal: names::APP_VERSION,
        predicate: Predicate::Matches("headless"),
        verdict: BotKind::HeadlessBrowser,
    },
    Probe {
        signal: names::APP_VERSION,
        predicate: Predicate::Matches("electron"),
        verdict: BotKind::EmbeddedRuntime,
    },
    Probe {
        signal: names::APP_VERSION,
        predicate: Predicate::Matches("slimerjs"),
        verdict: BotKind::Phantom,
    },
];

pub(super) fn app_version() -> Detector {
    Detector::new("app_version", &[names::APP_VERSION], |snapshot| {
        super::probes::run_probes(snapshot, APP_VERSION_PROBES)
    })
}

const USER_AGENT_PROBES: &[Probe] = &[
    Probe {
        signal: names::USER_AGENT,
        predicate: Predicate::Matches("phantomjs"),
        verdict: BotKind::Phantom,
    },
    Probe {
        signal: names::USER_AGENT,
        predicate: Predicate::Matches("headless"),
        verdict: BotKind::HeadlessBrowser,
    },
    Probe {
        signal: names::USER_AGENT,
        predicate: Predicate::Matches("electron"),
        verdict: BotKind::EmbeddedRuntime,
    },
    Probe {
        signal: names::USER_AGENT,
        predicate: Predicate::Matches("slimerjs"),
        verdict: BotKind::Phantom,
    },
];

pub(super) fn user_agent() -> Detector {
    Detector::new("user_agent", &[names::USER_AGENT], |snapshot| {
        super::probes::run_probes(snapshot, USER_AGENT_PROBES)
    })
}

/// PhantomJS leaks its name into synthetic error stack traces.
pub(super) fn error_trace() -> Detector {
    const PROBES: &[Probe] = &[Probe {
        signal: names::ERROR_TRACE,
        predicate: Predicate::Matches("phantomjs"),
        verdict: BotKind::Phantom,
    }];
    Detector::new("error_trace", &[names::ERROR_TRACE], |snapshot| {
        super::probes::run_probes(snapshot, PROBES)
    })
}

/// A genuine `Function.prototype.bind` stringifies to native code; legacy
/// Phantom builds ship a polyfilled source body instead.
pub(super) fn function_bind() -> Detector {
    const PROBES: &[Probe] = &[Probe {
        signal: names::FUNCTION_BIND,
        predicate: Predicate::LacksMatch("native code"),
        verdict: BotKind::Phantom,
    }];
    Detector::new("function_bind", &[names::FUNCTION_BIND], |snapshot| {
        super::probes::run_probes(snapshot, PROBES)
    })
}

/// Sequentum exposes itself on the `window.external` stringification.
pub(super) fn window_external() -> Detector {
    const PROBES: &[Probe] = &[Probe {
        signal: names::WINDOW_EXTERNAL,
        predicate: Predicate::Matches("sequentum"),
        verdict: BotKind::Sequentum,
    }];
    Detector::new("window_external", &[names::WINDOW_EXTERNAL], |snapshot| {
        super::probes::run_probes(snapshot, PROBES)
    })
}
