//! Lexical fragment boundary detection.
//!
//! The dump is never parsed as a whole. Instead each trimmed line is compared
//! against the four marker strings, and the lines between an open marker and
//! its close marker are buffered into a [`Fragment`]. The export format puts
//! every marker on its own line and escapes markup inside revision text, so a
//! body line can only equal a marker when the dump itself is damaged.

use crate::config::{NAMESPACES_CLOSE, NAMESPACES_OPEN, PAGE_CLOSE, PAGE_OPEN};
use crate::error::ImportError;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Namespaces,
    Page,
}

impl FragmentKind {
    fn close_marker(self) -> &'static str {
        match self {
            FragmentKind::Namespaces => NAMESPACES_CLOSE,
            FragmentKind::Page => PAGE_CLOSE,
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentKind::Namespaces => f.write_str("namespaces"),
            FragmentKind::Page => f.write_str("page"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing(FragmentKind),
}

/// Line-fed state machine that emits one fragment per matching close marker.
#[derive(Debug)]
pub struct FragmentAssembler {
    state: CaptureState,
    body: String,
    stray_close_markers: u64,
}

impl Default for FragmentAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FragmentAssembler {
    pub fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            body: String::new(),
            stray_close_markers: 0,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Close markers seen while no fragment was open.
    pub fn stray_close_markers(&self) -> u64 {
        self.stray_close_markers
    }

    /// Feeds one trimmed line. Returns the completed fragment when `line` closes one.
    pub fn push_line(&mut self, line: &str) -> Option<Fragment> {
        match self.state {
            CaptureState::Idle => {
                let kind = match line {
                    NAMESPACES_OPEN => FragmentKind::Namespaces,
                    PAGE_OPEN => FragmentKind::Page,
                    NAMESPACES_CLOSE | PAGE_CLOSE => {
                        self.stray_close_markers += 1;
                        warn!(marker = line, "Close marker without open fragment");
                        return None;
                    }
                    _ => return None,
                };
                self.state = CaptureState::Capturing(kind);
                self.append(line);
                None
            }
            CaptureState::Capturing(kind) => {
                self.append(line);
                if line != kind.close_marker() {
                    return None;
                }
                self.state = CaptureState::Idle;
                Some(Fragment {
                    kind,
                    body: std::mem::take(&mut self.body),
                })
            }
        }
    }

    /// Drops any partially captured fragment and returns to `Idle`.
    pub fn reset(&mut self) {
        self.state = CaptureState::Idle;
        self.body.clear();
    }

    /// Checks that the stream ended between fragments.
    pub fn finish(self) -> Result<(), ImportError> {
        match self.state {
            CaptureState::Idle => Ok(()),
            CaptureState::Capturing(kind) => Err(ImportError::UnterminatedFragment { kind }),
        }
    }

    fn append(&mut self, line: &str) {
        self.body.push_str(line);
        self.body.push('\n');
    }
}
