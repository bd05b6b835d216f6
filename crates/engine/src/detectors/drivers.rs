//! Driver-identification detectors.
//!
//! The four driver heuristics (Puppeteer, pyppeteer-stealth,
//! undetected-chromedriver, browserless) share one shape: an ordered stack
//! of probes evaluated top-to-bottom, differing only in thresholds and
//! output tags. They are therefore rows of a [`DriverProfile`] table rather
//! than four separate control flows.

use botvet_core::signal::names;
use botvet_core::{BotKind, Snapshot};
use serde_json::Value;

use super::probes::{pattern_matches, Predicate, Probe};
use super::Detector;

/// One row of a driver stack: either a single-signal probe or a
/// cross-signal consistency check.
enum Row {
    Probe(Probe),
    Check(fn(&Snapshot) -> bool, BotKind),
}

struct DriverProfile {
    name: &'static str,
    requires: &'static [&'static str],
    rows: &'static [Row],
}

impl DriverProfile {
    fn matched(&self, snapshot: &Snapshot) -> Option<BotKind> {
        for row in self.rows {
            match row {
                Row::Probe(probe) => {
                    let hit = snapshot
                        .trusted_path(probe.signal)
                        .map(|value| probe.predicate.holds(value))
                        .unwrap_or(false);
                    if hit {
                        return Some(probe.verdict);
                    }
                }
                Row::Check(check, verdict) => {
                    if check(snapshot) {
                        return Some(*verdict);
                    }
                }
            }
        }
        None
    }
}

// ── Cross-signal checks ─────────────────────────────────────────────

/// Windows platform identity while the user agent never mentions Windows.
fn platform_ua_mismatch(snapshot: &Snapshot) -> bool {
    let Some(platform) = snapshot.str_value(names::PLATFORM) else {
        return false;
    };
    let Some(ua) = snapshot.str_value(names::USER_AGENT) else {
        return false;
    };
    platform.contains("Win") && pattern_matches("chrome", ua) && !pattern_matches("windows", ua)
}

/// A Windows desktop reporting active touch points.
fn windows_touch_mismatch(snapshot: &Snapshot) -> bool {
    let Some(platform) = snapshot.str_value(names::PLATFORM) else {
        return false;
    };
    let touch_points = snapshot.u64_value(names::MAX_TOUCH_POINTS).unwrap_or(0);
    platform.contains("Win") && touch_points > 0
}

/// No plugins combined with a near-empty language list.
fn bare_plugins_and_languages(snapshot: &Snapshot) -> bool {
    let Some(plugins) = snapshot.u64_value(names::PLUGINS_LENGTH) else {
        return false;
    };
    let Some(languages) = snapshot.array_len(names::LANGUAGES) else {
        return false;
    };
    plugins == 0 && languages < 2
}

fn media_permission(snapshot: &Snapshot, device: &str) -> Option<String> {
    snapshot
        .trusted_path(&format!("{}.{}", names::MEDIA_PERMISSIONS, device))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Any media permission outright denied (prompt is acceptable).
fn media_permission_denied(snapshot: &Snapshot) -> bool {
    ["camera", "microphone"]
        .iter()
        .any(|device| media_permission(snapshot, device).as_deref() == Some("denied"))
}

/// Any media permission short of granted (prompt included).
fn media_permission_not_granted(snapshot: &Snapshot) -> bool {
    ["camera", "microphone"].iter().any(|device| {
        media_permission(snapshot, device)
            .map(|state| state != "granted")
            .unwrap_or(false)
    })
}

// ── Driver stacks ───────────────────────────────────────────────────

const SOFTWARE_RENDERER: &str = "swiftshader|llvmpipe|mesa";

static PUPPETEER: DriverProfile = DriverProfile {
    name: "puppeteer",
    requires: &[names::USER_AGENT],
    rows: &[
        Row::Probe(Probe {
            signal: names::USER_AGENT,
            predicate: Predicate::Matches("puppeteer|headless|chrome-lighthouse"),
            verdict: BotKind::Puppeteer,
        }),
        Row::Probe(Probe {
            signal: names::WEB_DRIVER,
            predicate: Predicate::Truthy,
            verdict: BotKind::HeadlessBrowser,
        }),
        Row::Check(bare_plugins_and_languages, BotKind::PuppeteerStealth),
        Row::Probe(Probe {
            signal: names::HARDWARE_CONCURRENCY,
            predicate: Predicate::AtMost(2.0),
            verdict: BotKind::PuppeteerStealth,
        }),
        Row::Probe(Probe {
            signal: names::COOKIES_ENABLED,
            predicate: Predicate::IsFalse,
            verdict: BotKind::PuppeteerStealth,
        }),
        Row::Check(platform_ua_mismatch, BotKind::PuppeteerStealth),
        Row::Check(windows_touch_mismatch, BotKind::PuppeteerStealth),
        Row::Probe(Probe {
            signal: "webGL.renderer",
            predicate: Predicate::Matches(SOFTWARE_RENDERER),
            verdict: BotKind::HeadlessBrowser,
        }),
        Row::Check(media_permission_denied, BotKind::PuppeteerStealth),
        Row::Probe(Probe {
            signal: names::MEDIA_DEVICE_COUNT,
            predicate: Predicate::AtMost(0.0),
            verdict: BotKind::PuppeteerStealth,
        }),
        Row::Probe(Probe {
            signal: names::NAVIGATION_DURATION,
            predicate: Predicate::Below(1000.0),
            verdict: BotKind::PuppeteerStealth,
        }),
        Row::Probe(Probe {
            signal: names::INTERACTION_LATENCY,
            predicate: Predicate::Below(500.0),
            verdict: BotKind::PuppeteerStealth,
        }),
    ],
};

static PYPPETEER: DriverProfile = DriverProfile {
    name: "pyppeteer_stealth",
    requires: &[names::USER_AGENT],
    rows: &[
        Row::Probe(Probe {
            signal: names::USER_AGENT,
            predicate: Predicate::Matches("pyppeteer|headless"),
            verdict: BotKind::Pyppeteer,
        }),
        Row::Probe(Probe {
            signal: names::WEB_DRIVER,
            predicate: Predicate::Truthy,
            verdict: BotKind::Pyppeteer,
        }),
        Row::Probe(Probe {
            signal: names::PLUGINS_LENGTH,
            predicate: Predicate::AtMost(0.0),
            verdict: BotKind::Pyppeteer,
        }),
        Row::Probe(Probe {
            signal: names::LANGUAGES,
            predicate: Predicate::CountIs(0),
            verdict: BotKind::Pyppeteer,
        }),
        Row::Probe(Probe {
            signal: names::DEVICE_MEMORY,
            predicate: Predicate::Below(4.0),
            verdict: BotKind::Pyppeteer,
        }),
        Row::Probe(Probe {
            signal: names::HARDWARE_CONCURRENCY,
            predicate: Predicate::AtMost(2.0),
            verdict: BotKind::Pyppeteer,
        }),
        Row::Probe(Probe {
            signal: "webGL.renderer",
            predicate: Predicate::Matches(SOFTWARE_RENDERER),
            verdict: BotKind::Pyppeteer,
        }),
        Row::Check(media_permission_not_granted, BotKind::Pyppeteer),
        Row::Probe(Probe {
            signal: names::MEDIA_DEVICE_COUNT,
            predicate: Predicate::AtMost(0.0),
            verdict: BotKind::Pyppeteer,
        }),
        Row::Probe(Probe {
            signal: names::RTC_CANDIDATES,
            predicate: Predicate::IsFalse,
            verdict: BotKind::Pyppeteer,
        }),
    ],
};

static UNDETECTED_DRIVER: DriverProfile = DriverProfile {
    name: "undetected_driver",
    requires: &[names::USER_AGENT],
    rows: &[
        Row::Probe(Probe {
            signal: names::USER_AGENT,
            predicate: Predicate::Matches("undetected-chromedriver"),
            verdict: BotKind::UndetectedDriver,
        }),
        Row::Probe(Probe {
            signal: names::WEB_DRIVER,
            predicate: Predicate::Truthy,
            verdict: BotKind::Selenium,
        }),
        Row::Probe(Probe {
            signal: names::PLUGINS_LENGTH,
            predicate: Predicate::AtMost(0.0),
            verdict: BotKind::UndetectedDriver,
        }),
        Row::Probe(Probe {
            signal: names::HARDWARE_CONCURRENCY,
            predicate: Predicate::AtMost(2.0),
            verdict: BotKind::UndetectedDriver,
        }),
        Row::Probe(Probe {
            signal: names::COOKIES_ENABLED,
            predicate: Predicate::IsFalse,
            verdict: BotKind::UndetectedDriver,
        }),
        Row::Check(platform_ua_mismatch, BotKind::UndetectedDriver),
        Row::Probe(Probe {
            signal: "webGL.renderer",
            predicate: Predicate::Matches(SOFTWARE_RENDERER),
            verdict: BotKind::UndetectedDriver,
        }),
        Row::Check(media_permission_not_granted, BotKind::UndetectedDriver),
        Row::Probe(Probe {
            signal: names::MEDIA_DEVICE_COUNT,
            predicate: Predicate::AtMost(0.0),
            verdict: BotKind::UndetectedDriver,
        }),
        Row::Probe(Probe {
            signal: names::INTERACTION_LATENCY,
            predicate: Predicate::Below(100.0),
            verdict: BotKind::UndetectedDriver,
        }),
    ],
};

static BROWSERLESS: DriverProfile = DriverProfile {
    name: "browserless",
    requires: &[names::USER_AGENT],
    rows: &[
        Row::Probe(Probe {
            signal: names::USER_AGENT,
            predicate: Predicate::Matches("browserless"),
            verdict: BotKind::Browserless,
        }),
        Row::Probe(Probe {
            signal: names::WEB_DRIVER,
            predicate: Predicate::Truthy,
            verdict: BotKind::Selenium,
        }),
        Row::Probe(Probe {
            signal: names::PLUGINS_LENGTH,
            predicate: Predicate::AtMost(0.0),
            verdict: BotKind::Browserless,
        }),
        Row::Probe(Probe {
            signal: names::HARDWARE_CONCURRENCY,
            predicate: Predicate::AtMost(2.0),
            verdict: BotKind::Browserless,
        }),
        Row::Probe(Probe {
            signal: names::COOKIES_ENABLED,
            predicate: Predicate::IsFalse,
            verdict: BotKind::Browserless,
        }),
        Row::Check(platform_ua_mismatch, BotKind::Browserless),
        Row::Probe(Probe {
            signal: "webGL.renderer",
            predicate: Predicate::Matches(SOFTWARE_RENDERER),
            verdict: BotKind::Browserless,
        }),
        Row::Check(media_permission_not_granted, BotKind::Browserless),
        Row::Probe(Probe {
            signal: names::MEDIA_DEVICE_COUNT,
            predicate: Predicate::AtMost(0.0),
            verdict: BotKind::Browserless,
        }),
        Row::Probe(Probe {
            signal: names::INTERACTION_LATENCY,
            predicate: Predicate::Below(100.0),
            verdict: BotKind::Browserless,
        }),
    ],
};

pub(super) fn puppeteer() -> Detector {
    Detector::new(PUPPETEER.name, PUPPETEER.requires, |snapshot| {
        PUPPETEER.matched(snapshot)
    })
}

pub(super) fn pyppeteer_stealth() -> Detector {
    Detector::new(PYPPETEER.name, PYPPETEER.requires, |snapshot| {
        PYPPETEER.matched(snapshot)
    })
}

pub(super) fn undetected_driver() -> Detector {
    Detector::new(UNDETECTED_DRIVER.name, UNDETECTED_DRIVER.requires, |snapshot| {
        UNDETECTED_DRIVER.matched(snapshot)
    })
}

pub(super) fn browserless() -> Detector {
    Detector::new(BROWSERLESS.name, BROWSERLESS.requires, |snapshot| {
        BROWSERLESS.matched(snapshot)
    })
}
