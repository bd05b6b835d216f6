//! The closed set of automation identity tags the engine can report.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Automation identities reportable by detectors and rules.
///
/// "No match" is expressed as `Option::<BotKind>::None` by every consumer,
/// never as a variant. Rule providers reference these tags by their exact
/// variant name (e.g. `"GenericAutomation"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BotKind {
    /// Headless rendering mode of a mainstream browser (HeadlessChrome et al.).
    HeadlessBrowser,
    /// Browser embedded in a desktop runtime (Electron, NW.js).
    EmbeddedRuntime,
    Selenium,
    Puppeteer,
    PuppeteerStealth,
    Pyppeteer,
    UndetectedDriver,
    Browserless,
    Awesomium,
    Cef,
    Phantom,
    DomAutomation,
    Sequentum,
    /// Automation is evident but no specific stack could be identified.
    GenericAutomation,
}

impl fmt::Display for BotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BotKind::HeadlessBrowser => "HeadlessBrowser",
            BotKind::EmbeddedRuntime => "EmbeddedRuntime",
            BotKind::Selenium => "Selenium",
            BotKind::Puppeteer => "Puppeteer",
            BotKind::PuppeteerStealth => "PuppeteerStealth",
            BotKind::Pyppeteer => "Pyppeteer",
            BotKind::UndetectedDriver => "UndetectedDriver",
            BotKind::Browserless => "Browserless",
            BotKind::Awesomium => "Awesomium",
            BotKind::Cef => "Cef",
            BotKind::Phantom => "Phantom",
            BotKind::DomAutomation => "DomAutomation",
            BotKind::Sequentum => "Sequentum",
            BotKind::GenericAutomation => "GenericAutomation",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for BotKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "HeadlessBrowser" => Ok(BotKind::HeadlessBrowser),
            "EmbeddedRuntime" => Ok(BotKind::EmbeddedRuntime),
            "Selenium" => Ok(BotKind::Selenium),
            "Puppeteer" => Ok(BotKind::Puppeteer),
            "PuppeteerStealth" => Ok(BotKind::PuppeteerStealth),
            "Pyppeteer" => Ok(BotKind::Pyppeteer),
            "UndetectedDriver" => Ok(BotKind::UndetectedDriver),
            "Browserless" => Ok(BotKind::Browserless),
            "Awesomium" => Ok(BotKind::Awesomium),
            "Cef" => Ok(BotKind::Cef),
            "Phantom" => Ok(BotKind::Phantom),
            "DomAutomation" => Ok(BotKind::DomAutomation),
            "Sequentum" => Ok(BotKind::Sequentum),
            "GenericAutomation" => Ok(BotKind::GenericAutomation),
            other => Err(format!("unknown bot kind: '{}'", other)),
        }
    }
}
