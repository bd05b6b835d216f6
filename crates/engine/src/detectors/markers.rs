//! Automation-marker detectors: control-surface flags and injected globals.

use botvet_core::signal::names;
use botvet_core::BotKind;

use super::probes::{run_probes, Predicate, Probe};
use super::Detector;

/// The W3C `navigator.webdriver` flag — the canonical driver control marker.
pub(super) fn automation_marker() -> Detector {
    const PROBES: &[Probe] = &[Probe {
        signal: names::WEB_DRIVER,
        predicate: Predicate::Truthy,
        verdict: BotKind::Selenium,
    }];
    Detector::new("automation_marker", &[names::WEB_DRIVER], |snapshot| {
        run_probes(snapshot, PROBES)
    })
}

/// Globals injected by known automation frameworks. Scanned in table order;
/// the first present marker determines the tag.
const MARKER_TABLE: &[Probe] = &[
    Probe {
        signal: "distinctiveProps.awesomium",
        predicate: Predicate::Truthy,
        verdict: BotKind::Awesomium,
    },
    Probe {
        signal: "distinctiveProps.cef",
        predicate: Predicate::Truthy,
        verdict: BotKind::Cef,
    },
    Probe {
        signal: "distinctiveProps.phantom",
        predicate: Predicate::Truthy,
        verdict: BotKind::Phantom,
    },
    Probe {
        signal: "distinctiveProps.selenium",
        predicate: Predicate::Truthy,
        verdict: BotKind::Selenium,
    },
    Probe {
        signal: "distinctiveProps.webdriver",
        predicate: Predicate::Truthy,
        verdict: BotKind::Selenium,
    },
    Probe {
        signal: "distinctiveProps.domAutomation",
        predicate: Predicate::Truthy,
        verdict: BotKind::DomAutomation,
    },
];

pub(super) fn distinctive_markers() -> Detector {
    Detector::new(
        "distinctive_markers",
        &[names::DISTINCTIVE_PROPS],
        |snapshot| run_probes(snapshot, MARKER_TABLE),
    )
}
