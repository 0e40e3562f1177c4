use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

/// User-authored shader program attached to a geometry.
///
/// The source is a single WGSL module exposing `vs_main` and `fs_main` and
/// using the shared bind group layout (globals + lights, material, skin).
/// It bypasses light specialization and is compiled once per program id.
#[derive(Debug)]
pub struct CustomProgram {
    id: u64,
    pub label: Cow<'static, str>,
    source: Cow<'static, str>,
}

impl CustomProgram {
    #[must_use]
    pub fn new(label: impl Into<Cow<'static, str>>, source: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id: NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
            source: source.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}
