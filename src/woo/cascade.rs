//! Compiled selector cascades.
//!
//! A cascade is an ordered list of selectors evaluated short-circuit: the
//! first candidate that structurally matches decides the outcome, whether or
//! not the matched element holds anything useful.

use scraper::{ElementRef, Selector};
use tracing::{trace, warn};

/// One compiled selector together with its source text (for logs).
#[derive(Debug, Clone)]
struct Candidate {
    source: String,
    selector: Selector,
}

/// An ordered, non-empty list of compiled selectors.
#[derive(Debug, Clone)]
pub struct Cascade {
    name: String,
    candidates: Vec<Candidate>,
}

impl Cascade {
    /// Compiles the given selector strings, skipping any that fail to parse.
    ///
    /// Returns `None` if no candidate survives.
    pub fn compile<S: AsRef<str>>(name: &str, sources: &[S]) -> Option<Self> {
        let candidates: Vec<Candidate> = sources
            .iter()
            .filter_map(|source| {
                let source = source.as_ref().trim();
                match Selector::parse(source) {
                    Ok(selector) => Some(Candidate { source: source.to_string(), selector }),
                    Err(e) => {
                        warn!("Ignoring invalid {} selector '{}': {}", name, source, e);
                        None
                    }
                }
            })
            .collect();

        if candidates.is_empty() {
            return None;
        }

        Some(Self { name: name.to_string(), candidates })
    }

    /// Compiles a built-in default list.
    ///
    /// Defaults are compile-time constants covered by a unit test, so a
    /// failure here is a programming error.
    pub fn defaults(name: &str, sources: &[&str]) -> Self {
        Self::compile(name, sources)
            .unwrap_or_else(|| panic!("default {} selectors must compile", name))
    }

    /// Compiles an override list, falling back to `defaults` when the
    /// override is empty or entirely invalid.
    pub fn with_override(name: &str, sources: Option<&[String]>, defaults: &[&str]) -> Self {
        match sources {
            Some(list) if !list.is_empty() => Self::compile(name, list).unwrap_or_else(|| {
                warn!("No usable {} selectors in config, using defaults", name);
                Self::defaults(name, defaults)
            }),
            Some(_) => {
                warn!("Empty {} selector list in config, using defaults", name);
                Self::defaults(name, defaults)
            }
            None => Self::defaults(name, defaults),
        }
    }

    /// Source strings of the candidates, in priority order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.source.as_str())
    }

    /// Returns the first element matched by the first candidate that matches
    /// anything.
    pub fn first<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.candidates.iter().find_map(|c| {
            let found = scope.select(&c.selector).next();
            if found.is_some() {
                trace!("{} matched '{}'", self.name, c.source);
            }
            found
        })
    }

    /// Returns every element matched by the first candidate that matches
    /// anything, along with that candidate's source.
    pub fn first_all<'a>(&self, scope: ElementRef<'a>) -> Option<(&str, Vec<ElementRef<'a>>)> {
        self.candidates.iter().find_map(|c| {
            let found: Vec<_> = scope.select(&c.selector).collect();
            if found.is_empty() {
                None
            } else {
                Some((c.source.as_str(), found))
            }
        })
    }

    /// Walks the candidates in order, handing each one's first match to
    /// `accept`, and returns the first value it accepts.
    ///
    /// Candidates that match nothing are skipped without calling `accept`.
    pub fn find_first_map<'a, T>(
        &self,
        scope: ElementRef<'a>,
        mut accept: impl FnMut(ElementRef<'a>) -> Option<T>,
    ) -> Option<T> {
        self.candidates.iter().find_map(|c| scope.select(&c.selector).next().and_then(&mut accept))
    }

    /// Like [`Cascade::find_first_map`] but hands the last match of each
    /// candidate to `accept`.
    pub fn find_last_map<'a, T>(
        &self,
        scope: ElementRef<'a>,
        mut accept: impl FnMut(ElementRef<'a>) -> Option<T>,
    ) -> Option<T> {
        self.candidates.iter().find_map(|c| scope.select(&c.selector).last().and_then(&mut accept))
    }
}

/// Collects the element's text nodes, each trimmed, with no separator.
pub fn element_text(element: ElementRef) -> String {
    element.text().map(str::trim).filter(|s| !s.is_empty()).collect()
}
