//! Environment-consistency detectors: counts, thresholds, and cross-signal
//! plausibility checks that real browsers on real hardware satisfy.

use botvet_core::signal::names;
use botvet_core::{BotKind, Snapshot};
use serde_json::Value;

use super::probes::{run_probes, Predicate, Probe};
use super::Detector;

/// Selenium leaves injected attributes on the document element.
pub(super) fn document_attributes() -> Detector {
    Detector::new(
        "document_attributes",
        &[names::DOCUMENT_ELEMENT_KEYS],
        |snapshot| {
            const MARKERS: &[&str] = &["selenium", "webdriver", "driver"];
            let keys = snapshot.trusted(names::DOCUMENT_ELEMENT_KEYS)?.as_array()?;
            let hit = keys.iter().filter_map(Value::as_str).any(|key| {
                let key = key.to_ascii_lowercase();
                MARKERS.iter().any(|marker| key.contains(marker))
            });
            hit.then_some(BotKind::Selenium)
        },
    )
}

/// `eval.toString().length` is a stable per-engine constant; a value that
/// disagrees with the reported engine means a spoofed identity.
pub(super) fn eval_length() -> Detector {
    Detector::new(
        "eval_length",
        &[names::EVAL_LENGTH, names::BROWSER_ENGINE_KIND],
        |snapshot| {
            let length = snapshot.u64_value(names::EVAL_LENGTH)?;
            let engine = snapshot.str_value(names::BROWSER_ENGINE_KIND)?;
            let consistent = match engine {
                "Gecko" => length == 33,
                // V8 reports 33 under Blink's WebKit-flavored identity; JSC 37.
                "WebKit" => length == 33 || length == 37,
                _ => return None,
            };
            (!consistent).then_some(BotKind::GenericAutomation)
        },
    )
}

pub(super) fn languages_inconsistency() -> Detector {
    const PROBES: &[Probe] = &[Probe {
        signal: names::LANGUAGES,
        predicate: Predicate::CountIs(0),
        verdict: BotKind::HeadlessBrowser,
    }];
    Detector::new("languages_inconsistency", &[names::LANGUAGES], |snapshot| {
        run_probes(snapshot, PROBES)
    })
}

pub(super) fn mime_types_consistency() -> Detector {
    const PROBES: &[Probe] = &[Probe {
        signal: names::MIME_TYPES_CONSISTENT,
        predicate: Predicate::IsFalse,
        verdict: BotKind::GenericAutomation,
    }];
    Detector::new(
        "mime_types_consistency",
        &[names::MIME_TYPES_CONSISTENT],
        |snapshot| run_probes(snapshot, PROBES),
    )
}

/// Headless Chrome auto-denies notification permission without a prompt.
pub(super) fn notification_permissions() -> Detector {
    Detector::new(
        "notification_permissions",
        &[names::NOTIFICATION_PERMISSION, names::BROWSER_KIND],
        |snapshot| {
            let permission = snapshot.str_value(names::NOTIFICATION_PERMISSION)?;
            let browser = snapshot.str_value(names::BROWSER_KIND)?;
            (browser == "Chrome" && permission == "denied").then_some(BotKind::HeadlessBrowser)
        },
    )
}

/// Desktop Chrome always reports internal PDF plugins; zero is headless.
pub(super) fn plugins_array() -> Detector {
    Detector::new(
        "plugins_array",
        &[names::PLUGINS_LENGTH, names::BROWSER_KIND],
        |snapshot| {
            let count = snapshot.u64_value(names::PLUGINS_LENGTH)?;
            let browser = snapshot.str_value(names::BROWSER_KIND)?;
            (browser == "Chrome" && count == 0).then_some(BotKind::HeadlessBrowser)
        },
    )
}

/// A reachable Node `process` global only exists inside embedded runtimes.
pub(super) fn process() -> Detector {
    Detector::new("process", &[names::PROCESS], |snapshot| {
        let renderer = snapshot
            .trusted_path("process.type")
            .and_then(Value::as_str)
            .map(|t| t == "renderer")
            .unwrap_or(false);
        let electron = snapshot
            .trusted_path("process.versions.electron")
            .map(|v| !v.is_null())
            .unwrap_or(false);
        (renderer || electron).then_some(BotKind::EmbeddedRuntime)
    })
}

/// Chromium and WebKit pin `navigator.productSub` to `20030107`.
pub(super) fn product_sub() -> Detector {
    Detector::new(
        "product_sub",
        &[names::PRODUCT_SUB, names::BROWSER_KIND],
        |snapshot| {
            let product_sub = snapshot.str_value(names::PRODUCT_SUB)?;
            let browser = snapshot.str_value(names::BROWSER_KIND)?;
            let mismatch =
                matches!(browser, "Chrome" | "Safari") && product_sub != "20030107";
            mismatch.then_some(BotKind::GenericAutomation)
        },
    )
}

/// Software rasterizer signatures in the WebGL renderer string.
pub(super) fn software_renderer() -> Detector {
    const PROBES: &[Probe] = &[Probe {
        signal: "webGL.renderer",
        predicate: Predicate::Matches("swiftshader|llvmpipe|mesa"),
        verdict: BotKind::HeadlessBrowser,
    }];
    Detector::new("software_renderer", &[names::WEB_GL], |snapshot| {
        run_probes(snapshot, PROBES)
    })
}

/// A focused window with zero outer dimensions does not exist on screen.
pub(super) fn window_size() -> Detector {
    Detector::new(
        "window_size",
        &[names::WINDOW_SIZE, names::DOCUMENT_FOCUS],
        |snapshot| {
            if snapshot.bool_value(names::DOCUMENT_FOCUS) != Some(true) {
                return None;
            }
            let outer_width = snapshot
                .trusted_path("windowSize.outerWidth")
                .and_then(Value::as_u64)?;
            let outer_height = snapshot
                .trusted_path("windowSize.outerHeight")
                .and_then(Value::as_u64)?;
            (outer_width == 0 && outer_height == 0).then_some(BotKind::HeadlessBrowser)
        },
    )
}
